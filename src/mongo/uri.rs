const SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "data";

/// Builds a connection string from a raw endpoint.
///
/// Endpoints without a scheme get `mongodb://`. Credentials are added only
/// when both `user` and `password` are non-empty, right after the scheme.
pub fn connection_uri(endpoint: &str, user: &str, password: &str) -> String {
    let credentials = if !user.is_empty() && !password.is_empty() {
        format!("{}:{}@", user, password)
    } else {
        String::new()
    };

    for scheme in SCHEMES {
        if let Some(rest) = endpoint.strip_prefix(scheme) {
            return format!("{}{}{}", scheme, credentials, rest);
        }
    }
    format!("{}{}{}", SCHEMES[0], credentials, endpoint)
}
