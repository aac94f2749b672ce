//! Screen navigation
//!
//! Static route table with forward-only traversal and a single guarded entry
//! redirect: an already signed-in session skips the auth screens and starts
//! with an empty history.

/// Named routes the client can display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Splash,
    Signup,
    Login,
    Profile,
    Services,
    MyListings,
    Search,
}

impl Route {
    /// The route shown when a session starts
    pub fn entry(signed_in: bool) -> Route {
        if signed_in {
            Route::Services
        } else {
            Route::Signup
        }
    }

    /// Stable path name for the route
    pub fn path(&self) -> &'static str {
        match self {
            Route::Splash => "splash",
            Route::Signup => "signup",
            Route::Login => "login",
            Route::Profile => "profile",
            Route::Services => "services",
            Route::MyListings => "mylistings",
            Route::Search => "search",
        }
    }

    /// Resolve a path name back to a route
    pub fn from_path(path: &str) -> Option<Route> {
        match path {
            "splash" => Some(Route::Splash),
            "signup" => Some(Route::Signup),
            "login" => Some(Route::Login),
            "profile" => Some(Route::Profile),
            "services" => Some(Route::Services),
            "mylistings" => Some(Route::MyListings),
            "search" => Some(Route::Search),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Forward-only navigator over the route table
#[derive(Debug, Clone)]
pub struct Navigator {
    current: Route,
    history: Vec<Route>,
}

impl Navigator {
    /// Start at the guarded entry route for the session
    pub fn start(signed_in: bool) -> Self {
        Self {
            current: Route::entry(signed_in),
            history: Vec::new(),
        }
    }

    /// The route currently displayed
    pub fn current(&self) -> Route {
        self.current
    }

    /// Move forward to a route, pushing the current one onto the history
    pub fn navigate(&mut self, route: Route) {
        if route != self.current {
            self.history.push(self.current);
            self.current = route;
        }
    }

    /// Return to the previous route, if any
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(route) => {
                self.current = route;
                true
            }
            None => false,
        }
    }

    /// Jump past the auth screens after a successful sign-in, clearing history
    pub fn complete_auth(&mut self) {
        self.history.clear();
        self.current = Route::Services;
    }

    /// Number of routes that `back` can return to
    pub fn depth(&self) -> usize {
        self.history.len()
    }
}
