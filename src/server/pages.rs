//! Static HTML for the Slack install flow.

/// Shown after the OAuth round trip.
pub const INSTALLED: &str = r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>Module of the Week</title></head>
  <body>
    <h1>Installed!</h1>
    <p>Type <code>/motw</code> in any channel to see the latest module of the week.</p>
  </body>
</html>
"#;

/// Landing page with an "Add to Slack" link for `client_id`.
pub fn landing(client_id: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>Module of the Week for Slack</title></head>
  <body>
    <h1>Module of the Week for Slack</h1>
    <p>Get the latest featured module right in your channel.</p>
    <a href="https://slack.com/oauth/authorize?scope=commands&client_id={client_id}">Add to Slack</a>
  </body>
</html>
"#
    )
}
