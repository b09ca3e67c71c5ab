use std::path::Path;

use anyhow::Result;

use infohub_auth::AuthService;

pub async fn login(base_dir: &Path, identifier: &str, password: &Option<String>) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let password = super::get_password(password)?;

    let auth = AuthService::from_hub(&hub);
    let session = auth.login(identifier, &password).await?;

    println!(
        "Signed in as {} ({}, role: {})",
        session.name, session.username, session.role
    );
    Ok(())
}

pub async fn logout(base_dir: &Path) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    AuthService::from_hub(&hub).logout().await?;
    println!("Signed out.");
    Ok(())
}

pub async fn signup(
    base_dir: &Path,
    name: &str,
    email: &str,
    password: &Option<String>,
) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let password = super::get_password(password)?;

    let auth = AuthService::from_hub(&hub);
    let session = auth.signup(name, email, &password).await?;

    println!(
        "Account created. Signed in as {} (view-only until an administrator grants access).",
        session.username
    );
    Ok(())
}

pub async fn whoami(base_dir: &Path) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    println!("User:       {} ({})", session.name, session.username);
    println!("Email:      {}", session.email);
    println!("Role:       {}", session.role);
    println!("Signed in:  {}", session.login_time);
    println!();

    let p = &session.permissions;
    println!("Permissions:");
    println!("  Manage users:      {}", p.can_manage_users);
    println!("  Edit all sections: {}", p.can_edit_all_sections);
    println!("  Delete resources:  {}", p.can_delete_resources);
    println!("  View audit log:    {}", p.can_view_audit_log);
    println!("  Manage roles:      {}", p.can_manage_roles);
    println!(
        "  Sections:          {}",
        p.sections.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!(
        "  Editable:          {}",
        p.editable_sections
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}
