//! Page routing: which page a path shows, who may see it, and which view
//! the template manager opens

/// Pages reachable by path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Landing,
    Login,
    Signup,
    Dashboard,
    Templates(TemplateView),
    Profile,
}

/// View of the template manager, chosen by the last path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateView {
    List,
    Create,
    Edit,
}

impl TemplateView {
    pub fn from_path(path: &str) -> Self {
        if path.ends_with("/create") {
            TemplateView::Create
        } else if path.ends_with("/edit") {
            TemplateView::Edit
        } else {
            TemplateView::List
        }
    }
}

impl Page {
    pub fn from_path(path: &str) -> Option<Self> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        let page = match path {
            "/" => Page::Landing,
            "/login" => Page::Login,
            "/signup" => Page::Signup,
            "/dashboard" => Page::Dashboard,
            "/templates" | "/templates/create" | "/templates/edit" => {
                Page::Templates(TemplateView::from_path(path))
            }
            "/profile" => Page::Profile,
            _ => return None,
        };
        Some(page)
    }

    /// Pages that need a signed-in user
    pub fn is_protected(self) -> bool {
        matches!(self, Page::Dashboard | Page::Templates(_) | Page::Profile)
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Landing => "Template Manager",
            Page::Login => "Sign in",
            Page::Signup => "Create account",
            Page::Dashboard => "Dashboard",
            Page::Templates(TemplateView::List) => "Templates",
            Page::Templates(TemplateView::Create) => "Create Template",
            Page::Templates(TemplateView::Edit) => "Edit Template",
            Page::Profile => "Profile",
        }
    }
}

/// What to do with a page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Render(Page),
    Redirect(String),
}

/// Decides between rendering and redirecting.
///
/// - unknown paths go to `/`
/// - protected pages without a session go to `/login?from=<path>`
/// - sign-in and sign-up pages with a session go to `/dashboard`
pub fn resolve(path: &str, signed_in: bool) -> PageOutcome {
    let Some(page) = Page::from_path(path) else {
        return PageOutcome::Redirect("/".to_string());
    };

    if page.is_protected() && !signed_in {
        return PageOutcome::Redirect(format!("/login?from={}", encode_query_value(path)));
    }
    if matches!(page, Page::Login | Page::Signup) && signed_in {
        return PageOutcome::Redirect("/dashboard".to_string());
    }
    PageOutcome::Render(page)
}

fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(char::from(byte));
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
