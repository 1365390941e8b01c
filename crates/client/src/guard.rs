//! Role-based route guard and the app's route table.

use medico_core::UserRole;
use serde::Serialize;

use crate::session::AuthState;

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

/// Decide whether the current user may open a route needing `required`.
///
/// Any one of the roles is enough unless `require_all` is set, in which case
/// holding all of them is also accepted.
#[must_use]
pub fn check_access(required: &[UserRole], require_all: bool, auth: &AuthState) -> Access {
    if required.is_empty() {
        return Access::Allow;
    }

    if !auth.is_authenticated() {
        tracing::warn!("access denied: not authenticated");
        return if required.contains(&UserRole::Admin) {
            Access::Redirect("/admin/login")
        } else {
            Access::Redirect("/login")
        };
    }

    if auth.has_any_role(required) || (require_all && auth.has_all_roles(required)) {
        return Access::Allow;
    }

    let held = auth.roles();
    tracing::warn!(?required, ?held, "access denied: missing role");
    if held.contains(&UserRole::Admin) {
        Access::Redirect("/admin/dashboard")
    } else {
        Access::Redirect("/")
    }
}

/// Admin back-office pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPage {
    Profile,
    Dashboard,
    Users,
    Inventory,
    Orders,
    Issues,
    Reports,
    Backup,
    Content,
    Notifications,
}

impl AdminPage {
    fn from_segment(segment: &str) -> Option<Self> {
        Some(match segment {
            "profile" => Self::Profile,
            "dashboard" => Self::Dashboard,
            "users" => Self::Users,
            "inventory" => Self::Inventory,
            "orders" => Self::Orders,
            "issues" => Self::Issues,
            "reports" => Self::Reports,
            "backup" => Self::Backup,
            "content" => Self::Content,
            "notifications" => Self::Notifications,
            _ => return None,
        })
    }
}

/// Every page the app can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Home,
    Login,
    AdminLogin,
    AdminResetPassword,
    SymptomChecker,
    CustomerProfile,
    CustomerOrders,
    CustomerDashboard,
    Help,
    Admin(AdminPage),
}

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Final path after redirects, always starting with `/`.
    pub path: String,
    pub page: Page,
    /// Redirect hops taken on the way.
    pub redirects: Vec<String>,
}

enum Route {
    Page {
        page: Page,
        roles: &'static [UserRole],
    },
    Redirect(&'static str),
}

const CUSTOMER: &[UserRole] = &[UserRole::Customer];
const ADMIN: &[UserRole] = &[UserRole::Admin];
const MAX_REDIRECTS: usize = 5;

/// Resolve a path to a page, applying guards and redirects.
///
/// Query strings and fragments are ignored.
#[must_use]
pub fn navigate(path: &str, auth: &AuthState) -> Navigation {
    let mut current = normalize(path);
    let mut redirects = Vec::new();

    loop {
        let target = match resolve(&current) {
            Route::Page { page, roles } => match check_access(roles, false, auth) {
                Access::Allow => {
                    return Navigation {
                        path: current,
                        page,
                        redirects,
                    };
                }
                Access::Redirect(to) => to,
            },
            Route::Redirect(to) => to,
        };

        if redirects.len() >= MAX_REDIRECTS {
            tracing::warn!(path, "redirect loop, falling back to home");
            return Navigation {
                path: "/".to_string(),
                page: Page::Home,
                redirects,
            };
        }
        redirects.push(target.to_string());
        current = target.to_string();
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    format!("/{}", path.trim_matches('/'))
}

fn resolve(path: &str) -> Route {
    const fn page(page: Page, roles: &'static [UserRole]) -> Route {
        Route::Page { page, roles }
    }

    match path.trim_start_matches('/') {
        "" => page(Page::Home, &[]),
        "login" => page(Page::Login, &[]),
        "admin/login" => page(Page::AdminLogin, &[]),
        "admin/reset-password" => page(Page::AdminResetPassword, &[]),
        "symptom-checker" => page(Page::SymptomChecker, &[]),
        "profile" => page(Page::CustomerProfile, CUSTOMER),
        "orders" => page(Page::CustomerOrders, CUSTOMER),
        "me/dashboard" => page(Page::CustomerDashboard, CUSTOMER),
        "help" => page(Page::Help, CUSTOMER),
        "admin" => Route::Redirect("/admin/dashboard"),
        other => match other.strip_prefix("admin/").and_then(AdminPage::from_segment) {
            Some(admin) => page(Page::Admin(admin), ADMIN),
            None => Route::Redirect("/"),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use medico_core::{SessionId, UserId};
    use secrecy::SecretString;

    use super::*;
    use crate::session::Session;
    use crate::storage::MemoryStore;

    fn auth(roles: &[UserRole]) -> AuthState {
        let auth = AuthState::restore(Arc::new(MemoryStore::new()));
        if !roles.is_empty() {
            auth.login(
                Session::authenticated(UserId::new(1), SessionId::new("s-1"), roles.iter().copied()),
                SecretString::from("token"),
            );
        }
        auth
    }

    #[test]
    fn test_check_access_anonymous_redirects_to_matching_login() {
        let anonymous = auth(&[]);
        assert_eq!(check_access(&[], false, &anonymous), Access::Allow);
        assert_eq!(
            check_access(&[UserRole::Customer], false, &anonymous),
            Access::Redirect("/login")
        );
        assert_eq!(
            check_access(&[UserRole::Admin], false, &anonymous),
            Access::Redirect("/admin/login")
        );
    }

    #[test]
    fn test_check_access_wrong_role() {
        let customer = auth(&[UserRole::Customer]);
        let admin = auth(&[UserRole::Admin]);

        assert_eq!(check_access(&[UserRole::Admin], false, &customer), Access::Redirect("/"));
        assert_eq!(
            check_access(&[UserRole::Customer], false, &admin),
            Access::Redirect("/admin/dashboard")
        );
        assert_eq!(
            check_access(&[UserRole::Customer, UserRole::Admin], false, &admin),
            Access::Allow
        );
    }

    #[test]
    fn test_navigate_public_pages() {
        let anonymous = auth(&[]);
        assert_eq!(navigate("/", &anonymous).page, Page::Home);
        assert_eq!(navigate("login", &anonymous).page, Page::Login);
        assert_eq!(navigate("/symptom-checker/", &anonymous).page, Page::SymptomChecker);
        assert_eq!(navigate("/admin/login?next=x", &anonymous).page, Page::AdminLogin);
    }

    #[test]
    fn test_navigate_customer_pages_require_login() {
        let nav = navigate("/orders", &auth(&[]));
        assert_eq!(nav.page, Page::Login);
        assert_eq!(nav.redirects, ["/login"]);

        let nav = navigate("/me/dashboard", &auth(&[UserRole::Customer]));
        assert_eq!(nav.page, Page::CustomerDashboard);
        assert!(nav.redirects.is_empty());
    }

    #[test]
    fn test_navigate_admin_area() {
        let admin = auth(&[UserRole::Admin]);
        let nav = navigate("/admin", &admin);
        assert_eq!(nav.path, "/admin/dashboard");
        assert_eq!(nav.page, Page::Admin(AdminPage::Dashboard));

        assert_eq!(navigate("/admin/inventory", &admin).page, Page::Admin(AdminPage::Inventory));
        assert_eq!(navigate("/help", &admin).page, Page::Admin(AdminPage::Dashboard));

        let nav = navigate("/admin/users", &auth(&[UserRole::Customer]));
        assert_eq!(nav.page, Page::Home);
        assert_eq!(nav.redirects, ["/"]);

        assert_eq!(navigate("/admin", &auth(&[])).page, Page::AdminLogin);
    }

    #[test]
    fn test_navigate_unknown_goes_home() {
        let nav = navigate("/no/such/page", &auth(&[]));
        assert_eq!(nav.path, "/");
        assert_eq!(nav.page, Page::Home);
        assert_eq!(navigate("/admin/nope", &auth(&[UserRole::Admin])).page, Page::Home);
    }
}
