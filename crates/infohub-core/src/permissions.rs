//! Pure authorization decisions over the live session.
//!
//! No state is held here: every check recomputes from the `Session`
//! passed in, so a permission change is visible as soon as the session
//! snapshot is refreshed from the user table.

use crate::types::{Resource, Role, Session};

/// True if the session may view resources in the section.
pub fn can_view(session: &Session, section_id: &str) -> bool {
    session.permissions.can_edit_all_sections
        || session.permissions.sections.contains(section_id)
}

/// True if the session may add or edit resources in the section.
pub fn can_edit(session: &Session, section_id: &str) -> bool {
    session.permissions.can_edit_all_sections
        || session.permissions.editable_sections.contains(section_id)
}

/// True if the session may delete resources in the section.
pub fn can_delete(session: &Session, section_id: &str) -> bool {
    session.permissions.can_delete_resources && can_edit(session, section_id)
}

pub fn is_admin(session: &Session) -> bool {
    session.role == Role::Admin || session.permissions.can_edit_all_sections
}

/// True if the resource is owned by the session's user. Legacy records
/// with no owner recorded are treated permissively.
pub fn is_resource_owner(session: &Session, resource: &Resource) -> bool {
    resource.user_id.is_empty() || resource.user_id == session.user_id
}

/// Row-level gate layered on top of the section-level gate: both the
/// section edit right and (admin or ownership) must hold.
pub fn can_modify_resource(session: &Session, resource: &Resource) -> bool {
    can_edit(session, &resource.section_id)
        && (is_admin(session) || is_resource_owner(session, resource))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Permissions, ResourceKind};

    fn session(role: Role, sections: &[&str], editable: &[&str]) -> Session {
        let mut perms = Permissions::default_for(
            role,
            &sections.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        );
        perms.editable_sections = editable.iter().map(|s| s.to_string()).collect();
        Session {
            user_id: "7".into(),
            username: "t".into(),
            role,
            name: "T".into(),
            email: "t@example.com".into(),
            login_time: crate::types::now_rfc3339(),
            permissions: perms,
        }
    }

    fn resource(section: &str, owner: &str) -> Resource {
        Resource {
            id: Resource::new_id(section, &ResourceKind::Playbooks),
            title: "r".into(),
            description: String::new(),
            url: "https://example.com".into(),
            category: String::new(),
            tags: vec![],
            kind: ResourceKind::Playbooks,
            section_id: section.into(),
            user_id: owner.into(),
            created_at: crate::types::now_rfc3339(),
            updated_at: None,
        }
    }

    #[test]
    fn view_follows_sections_or_global_edit() {
        let s = session(Role::User, &["costing"], &[]);
        assert!(can_view(&s, "costing"));
        assert!(!can_view(&s, "hr"));

        let mut admin = session(Role::Manager, &[], &[]);
        admin.permissions.can_edit_all_sections = true;
        assert!(can_view(&admin, "hr"));
    }

    #[test]
    fn edit_requires_editable_section() {
        let s = session(Role::User, &["costing"], &[]);
        assert!(!can_edit(&s, "costing"));

        let m = session(Role::Manager, &["costing"], &["costing"]);
        assert!(can_edit(&m, "costing"));
        assert!(!can_edit(&m, "hr"));
    }

    #[test]
    fn delete_needs_both_flag_and_edit() {
        let mut m = session(Role::Manager, &["costing"], &["costing"]);
        assert!(can_delete(&m, "costing"));
        m.permissions.can_delete_resources = false;
        assert!(!can_delete(&m, "costing"));
    }

    #[test]
    fn admin_by_role_or_global_flag() {
        assert!(is_admin(&session(Role::Admin, &[], &[])));
        let mut u = session(Role::User, &[], &[]);
        assert!(!is_admin(&u));
        u.permissions.can_edit_all_sections = true;
        assert!(is_admin(&u));
    }

    #[test]
    fn legacy_ownerless_resource_is_everyones() {
        let s = session(Role::User, &["costing"], &["costing"]);
        assert!(is_resource_owner(&s, &resource("costing", "")));
        assert!(is_resource_owner(&s, &resource("costing", "7")));
        assert!(!is_resource_owner(&s, &resource("costing", "9")));
    }

    #[test]
    fn row_gate_stacks_on_section_gate() {
        let owner = session(Role::User, &["costing"], &["costing"]);
        assert!(can_modify_resource(&owner, &resource("costing", "7")));
        assert!(!can_modify_resource(&owner, &resource("costing", "9")));
        // Section edit right missing: even ownership does not help.
        let viewer = session(Role::User, &["costing"], &[]);
        assert!(!can_modify_resource(&viewer, &resource("costing", "7")));
        // Admin overrides ownership, not the section gate shape.
        let admin = session(Role::Admin, &["costing"], &["costing"]);
        assert!(can_modify_resource(&admin, &resource("costing", "9")));
    }
}
