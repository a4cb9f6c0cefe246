// handlers module - HTTP route handlers
// Contains handlers for git operations, the export trigger and settings

pub mod export;
pub mod git;
pub mod settings;

use axum::response::Html;

/// A very simple index in case there is no UI installed
pub async fn index() -> Html<&'static str> {
    Html(
        r#"<html>
<body>
<ul>
<li><a href="/ui/">UI</a></li>
<li><a href="/export">Export current configuration</a></li>
<li><a href="/git/status?files=true">Git status</a></li>
<li><a href="/git/branch">Git branches</a></li>
<li><a href="/git/commit">Git add and commit configuration changes locally</a></li>
<li><a href="/git/push">Git push committed changes upstream</a></li>
<li><a href="/config">Current settings</a></li>
</ul>
</body>
</html>
"#,
    )
}
