//! HTML for every page. All dynamic text goes through `html_escape`.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::account::AccountStore;
use crate::mail::MessageSummary;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title} · mailrelay</title>
<script src="/static/js/script.js"></script>
</head>
<body>
<nav><a href="/">Accounts</a> | <a href="/add_account">Add account</a> | <a href="/fetch_emails">Inbox</a> | <a href="/send_email">Send</a></nav>
<h1>{title}</h1>
{body}
</body>
</html>
"#,
        title = text(title),
    )
}

pub fn index(store: &AccountStore) -> String {
    let mut body = String::new();

    match store.current() {
        Some(a) => body.push_str(&format!(
            "<p class=\"current\">Current account: <strong>{}</strong></p>\n",
            text(&a.username)
        )),
        None => body.push_str("<p class=\"current\">No account selected.</p>\n"),
    }

    if store.is_empty() {
        body.push_str("<p>No accounts yet. <a href=\"/add_account\">Add one</a>.</p>\n");
        return layout("Accounts", &body);
    }

    body.push_str("<ul>\n");
    for (i, a) in store.accounts().iter().enumerate() {
        let marker = if store.current_index() == Some(i) { " (current)" } else { "" };
        body.push_str(&format!(
            "<li><a href=\"/select_account/{i}\">{}</a> imap {}:{} smtp {}:{}{marker}</li>\n",
            text(&a.username),
            text(&a.imap_server),
            a.imap_port,
            text(&a.smtp_server),
            a.smtp_port,
        ));
    }
    body.push_str("</ul>\n");

    layout("Accounts", &body)
}

pub fn add_account() -> String {
    let body = r#"<form method="post" action="/add_account">
<label>Username <input name="username" type="text"></label><br>
<label>Password <input name="password" type="password"></label><br>
<label>IMAP server <input name="imap_server" type="text"></label>
<label>port <input name="imap_port" type="number" value="993"></label><br>
<label>SMTP server <input name="smtp_server" type="text"></label>
<label>port <input name="smtp_port" type="number" value="587"></label><br>
<button type="submit">Add</button>
</form>
"#;
    layout("Add account", body)
}

pub fn messages(list: &[MessageSummary]) -> String {
    if list.is_empty() {
        return layout("Inbox", "<p>The inbox is empty.</p>\n");
    }

    let mut body = String::from("<table>\n<tr><th>Date</th><th>From</th><th>Subject</th></tr>\n");
    for m in list {
        let subject = if m.subject.is_empty() { "(no subject)" } else { m.subject.as_str() };
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}",
            text(&m.date),
            text(&m.from),
            text(subject)
        ));
        if let Some(ex) = &m.excerpt {
            body.push_str(&format!("<br><small>{}</small>", text(ex)));
        }
        body.push_str("</td></tr>\n");
    }
    body.push_str("</table>\n");

    layout("Inbox", &body)
}

pub fn send_email(from: Option<&str>) -> String {
    let from_line = match from {
        Some(f) => format!("<p>From: <input value=\"{}\" disabled></p>\n", attr(f)),
        None => "<p>No account selected; sending will fail.</p>\n".to_string(),
    };
    let body = format!(
        r#"{from_line}<form method="post" action="/send_email">
<label>To <input name="to" type="email"></label><br>
<label>Subject <input name="subject" type="text"></label><br>
<textarea name="body" rows="12" cols="72"></textarea><br>
<button type="submit">Send</button>
</form>
"#
    );
    layout("Send", &body)
}

pub fn error(status: u16, message: &str) -> String {
    let body = format!("<p class=\"error\">{status}: {}</p>\n", text(message));
    layout("Error", &body)
}
