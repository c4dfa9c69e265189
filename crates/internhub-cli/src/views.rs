//! Protected dashboard views.
//!
//! Each view only supplies its content; the render-or-redirect decision comes
//! from `ProtectedView::mount`.

use internhub_core::models::Session;
use internhub_core::ProtectedView;

pub struct DashboardView;

impl ProtectedView for DashboardView {
    fn name(&self) -> &str {
        "dashboard"
    }

    fn render(&self, session: &Session) -> String {
        let user = &session.user;
        let mut out = format!("Welcome back, {}!\n", user.first_name());
        out.push_str(&format!("Signed in as {} ({})\n", user.email, user.role.display_name()));
        if user.is_admin() {
            out.push_str("Admin tools are available in the web console.\n");
        }
        out
    }
}

pub struct ProfileView;

impl ProtectedView for ProfileView {
    fn name(&self) -> &str {
        "profile"
    }

    fn render(&self, session: &Session) -> String {
        let user = &session.user;
        let rows = [
            ("ID", user.id.to_string()),
            ("Name", user.name.clone()),
            ("Email", user.email.clone()),
            ("Phone", user.phone.clone()),
            ("College", user.college.clone().unwrap_or_else(|| "-".to_string())),
            ("City", user.city.clone().unwrap_or_else(|| "-".to_string())),
            ("Role", user.role.display_name().to_string()),
        ];
        rows.iter()
            .map(|(label, value)| format!("{:<8} {}\n", label, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use internhub_core::models::{Role, User};

    fn session(role: Role) -> Session {
        Session::new(
            User {
                id: 3,
                name: "Ravi Kumar".to_string(),
                email: "ravi@x.com".to_string(),
                phone: "98".to_string(),
                college: None,
                city: Some("Chennai".to_string()),
                role,
            },
            "tok",
        )
    }

    #[test]
    fn test_dashboard_greets_by_first_name() {
        let out = DashboardView.render(&session(Role::Student));
        assert!(out.starts_with("Welcome back, Ravi!"));
        assert!(!out.contains("Admin tools"));

        let out = DashboardView.render(&session(Role::Admin));
        assert!(out.contains("Admin tools"));
    }

    #[test]
    fn test_profile_lists_optional_fields() {
        let out = ProfileView.render(&session(Role::Student));
        assert!(out.contains("College  -"));
        assert!(out.contains("City     Chennai"));
        assert!(!out.contains("tok"));
    }
}
