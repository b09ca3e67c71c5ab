//! Accounts provisioned on first run. A fresh install always has a
//! working administrator plus two reference accounts for the manager
//! and user roles.

use std::collections::BTreeSet;

use infohub_core::sections::default_section_ids;
use infohub_core::types::now_rfc3339;
use infohub_core::{Permissions, Role, User};

fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

pub fn default_users() -> Vec<User> {
    let all: BTreeSet<String> = default_section_ids().into_iter().collect();
    let now = now_rfc3339();
    vec![
        User {
            id: "1".to_string(),
            username: "admin".to_string(),
            password: "admin123".to_string(),
            role: Role::Admin,
            name: "System Administrator".to_string(),
            email: "admin@company.com".to_string(),
            permissions: Permissions {
                can_manage_users: true,
                can_edit_all_sections: true,
                can_delete_resources: true,
                can_view_audit_log: true,
                can_manage_roles: true,
                sections: all.clone(),
                editable_sections: all,
            },
            created_at: now.clone(),
        },
        User {
            id: "2".to_string(),
            username: "manager".to_string(),
            password: "manager123".to_string(),
            role: Role::Manager,
            name: "Department Manager".to_string(),
            email: "manager@company.com".to_string(),
            permissions: Permissions {
                can_manage_users: true,
                can_edit_all_sections: false,
                can_delete_resources: true,
                can_view_audit_log: false,
                can_manage_roles: false,
                sections: set(&["costing", "supply-planning", "operations", "quality"]),
                editable_sections: set(&["costing", "supply-planning", "operations", "quality"]),
            },
            created_at: now.clone(),
        },
        User {
            id: "3".to_string(),
            username: "user".to_string(),
            password: "user123".to_string(),
            role: Role::User,
            name: "Regular User".to_string(),
            email: "user@company.com".to_string(),
            permissions: Permissions {
                can_manage_users: false,
                can_edit_all_sections: false,
                can_delete_resources: false,
                can_view_audit_log: false,
                can_manage_roles: false,
                sections: set(&["costing", "supply-planning"]),
                editable_sections: BTreeSet::new(),
            },
            created_at: now,
        },
    ]
}
