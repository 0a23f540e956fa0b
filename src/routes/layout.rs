use actix_web::http::header::ContentType;
use actix_web::HttpResponse;
use actix_web_flash_messages::IncomingFlashMessages;

/// Escape user-supplied text before it is interpolated into markup.
pub fn escape(value: &str) -> String {
    htmlescape::encode_minimal(value)
}

pub fn flash_html(flash_messages: &IncomingFlashMessages) -> String {
    let mut html = String::new();
    for m in flash_messages.iter() {
        let level = format!("{:?}", m.level()).to_lowercase();
        html.push_str(&format!(
            "<p class=\"flash {}\"><i>{}</i></p>\n",
            level,
            escape(m.content())
        ));
    }
    html
}

/// Wrap `body` in the shared page chrome, flash messages first.
pub fn render_page(title: &str, flash_messages: &IncomingFlashMessages, body: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8">
    <title>{title}</title>
</head>
<body>
    <nav>
        <a href="/">Home</a> |
        <a href="/login">Login</a> |
        <a href="/register">Sign Up</a> |
        <a href="/dashboard">Dashboard</a>
    </nav>
    <h1>{title}</h1>
    {flash}
    {body}
</body>
</html>"#,
            title = escape(title),
            flash = flash_html(flash_messages),
            body = body,
        ))
}
