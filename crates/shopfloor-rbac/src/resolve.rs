//! # Resolution
//!
//! Pure multi-role decision logic. The effective permission of a principal is
//! the union of what each of its roles grants; a role without a row grants
//! nothing and does not stop the others from granting.

use crate::actions::Capability;
use crate::permissions::Permission;
use crate::policy::HIGHEST_ROLE;

/// Check whether any of the given rows grants `capability`.
///
/// # Example
///
/// ```
/// use shopfloor_rbac::{resolve, Action, Capability, Permission, Resource};
///
/// let deny = Permission::new("clerk", Resource::Orders);
/// let mut grant = Permission::new("auditor", Resource::Orders);
/// grant.can_delete = true;
///
/// assert!(resolve::grants([&deny, &grant], &Capability::from(Action::Delete)));
/// assert!(!resolve::grants([&deny], &Capability::from(Action::Delete)));
/// ```
pub fn grants<'a, I>(rows: I, capability: &Capability) -> bool
where
    I: IntoIterator<Item = &'a Permission>,
{
    rows.into_iter().any(|row| row.allows(capability))
}

/// Same as [`grants`] over optional rows, where `None` stands for a role
/// whose row has not been bootstrapped yet.
pub fn grants_any<'a, I>(rows: I, capability: &Capability) -> bool
where
    I: IntoIterator<Item = Option<&'a Permission>>,
{
    grants(rows.into_iter().flatten(), capability)
}

/// True when the role set contains the highest-privilege role.
pub fn is_highest<S: AsRef<str>>(roles: &[S]) -> bool {
    roles.iter().any(|r| r.as_ref() == HIGHEST_ROLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::resources::Resource;

    fn row(role: &str, configure: impl FnOnce(&mut Permission)) -> Permission {
        let mut perm = Permission::new(role, Resource::Orders);
        configure(&mut perm);
        perm
    }

    #[test]
    fn test_union_not_intersection() {
        let a = row("a", |p| p.can_read = true);
        let b = row("b", |p| p.can_delete = true);
        let rows = [&a, &b];

        for action in [Action::Read, Action::Delete] {
            assert!(grants(rows, &Capability::from(action)));
        }
        for action in [Action::Create, Action::Update] {
            assert!(!grants(rows, &Capability::from(action)));
        }
    }

    #[test]
    fn test_union_matches_or_of_flags() {
        let rows: Vec<Permission> = (0..16u8)
            .map(|bits| {
                row(&format!("r{}", bits), |p| {
                    p.can_create = bits & 1 != 0;
                    p.can_read = bits & 2 != 0;
                    p.can_update = bits & 4 != 0;
                    p.can_delete = bits & 8 != 0;
                })
            })
            .collect();

        for window in rows.windows(3) {
            for action in Action::all() {
                let expected = window.iter().any(|p| p.flag(action));
                assert_eq!(grants(window, &Capability::from(action)), expected);
            }
        }
    }

    #[test]
    fn test_missing_rows_grant_nothing() {
        let granted = row("b", |p| {
            p.sub_permissions.insert("approve".to_string(), true);
        });
        assert!(grants_any([None, Some(&granted)], &Capability::sub("approve")));
        let unbootstrapped: [Option<&Permission>; 2] = [None, None];
        assert!(!grants_any(unbootstrapped, &Capability::sub("approve")));
        let no_rows: [&Permission; 0] = [];
        assert!(!grants(no_rows, &Capability::from(Action::Read)));
    }

    #[test]
    fn test_is_highest() {
        assert!(is_highest(&["personnel", "super_admin"]));
        assert!(!is_highest(&["admin".to_string()]));
        assert!(!is_highest::<&str>(&[]));
    }
}
