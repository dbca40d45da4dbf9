use askama::Template;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub username: String,
    pub attributes: Vec<(String, String)>,
    pub login_time: Option<String>,
}

/// Shown when `/auth/callback` could not turn a ticket into a session
#[derive(Template)]
#[template(path = "callback.html")]
pub struct CallbackFailureTemplate {
    pub message: String,
    pub redirect_after_secs: u64,
}
