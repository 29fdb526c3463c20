//! Route-sharing precondition.
//!
//! Both groups serve traffic during a scaleover, so by default they must be
//! bound to at least one common route. Matching is exact; no wildcards.

use crate::error::{ScaleoverError, ScaleoverResult};
use crate::state::AppState;

/// Routes present on both groups, in `a`'s order.
pub fn shared_routes<'a>(a: &'a AppState, b: &AppState) -> Vec<&'a str> {
    a.routes
        .iter()
        .filter(|r| b.routes.contains(r))
        .map(String::as_str)
        .collect()
}

/// Whether the two groups share at least one route.
pub fn shares_route(a: &AppState, b: &AppState) -> bool {
    a.routes.iter().any(|r| b.routes.contains(r))
}

pub fn require_shared_route(source: &AppState, target: &AppState) -> ScaleoverResult<()> {
    if shares_route(source, target) {
        return Ok(());
    }
    Err(ScaleoverError::NoSharedRoute {
        source_app: source.name.clone(),
        target_app: target.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Lifecycle;

    fn app(name: &str, routes: &[&str]) -> AppState {
        AppState::new(name, 1, 1, Lifecycle::Started).with_routes(routes.iter().copied())
    }

    #[test]
    fn disjoint_routes_do_not_share() {
        let a = app("a", &["a.b.c", "b.c.d"]);
        let b = app("b", &["c.d.e", "d.e.f"]);
        assert!(!shares_route(&a, &b));
        assert!(matches!(
            require_shared_route(&a, &b),
            Err(ScaleoverError::NoSharedRoute { .. })
        ));
    }

    #[test]
    fn identical_groups_share() {
        let a = app("a", &["a.b.c", "b.c.d"]);
        assert!(shares_route(&a, &a.clone()));
    }

    #[test]
    fn one_common_route_is_enough() {
        let a = app("a", &["a.b.c", "b.c.d"]);
        let b = app("b", &["c.d.e", "d.e.f", "a.b.c"]);
        assert!(require_shared_route(&a, &b).is_ok());
        assert_eq!(shared_routes(&a, &b), vec!["a.b.c"]);
    }

    #[test]
    fn sharing_is_symmetric() {
        let cases = [
            (app("a", &["x.io"]), app("b", &["x.io", "y.io"])),
            (app("a", &["x.io"]), app("b", &["y.io"])),
            (app("a", &[]), app("b", &["y.io"])),
        ];
        for (a, b) in &cases {
            assert_eq!(shares_route(a, b), shares_route(b, a));
        }
    }

    #[test]
    fn no_prefix_matching() {
        let a = app("a", &["app.example.com"]);
        let b = app("b", &["app.example.com.au", "example.com"]);
        assert!(!shares_route(&a, &b));
    }

    #[test]
    fn empty_routes_never_share() {
        let a = app("a", &[]);
        let b = app("b", &[]);
        assert!(!shares_route(&a, &b));
    }
}
