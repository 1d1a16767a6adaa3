//! Fortune page assembly
//!
//! Reads the fortune table, adds the request-time fortune, orders everything
//! by message and renders the HTML table.

use std::fmt::Write;

use crate::error::BenchResult;
use crate::store::{Fortune, RowStore};

pub const ADDITIONAL_FORTUNE: &str = "Additional fortune added at request time.";

const PAGE_HEAD: &str = "<!DOCTYPE html><html><head><title>Fortunes</title></head><body><table><tr><th>id</th><th>message</th></tr>";
const PAGE_TAIL: &str = "</table></body></html>";

/// Byte-wise ordering on `message`.
#[inline]
pub fn by_message(a: &Fortune, b: &Fortune) -> std::cmp::Ordering {
    a.message.as_bytes().cmp(b.message.as_bytes())
}

/// Append the synthetic fortune and sort. The sort is stable, so fortunes
/// with equal messages keep their table order.
pub fn assemble(mut fortunes: Vec<Fortune>) -> Vec<Fortune> {
    fortunes.push(Fortune::new(0, ADDITIONAL_FORTUNE));
    fortunes.sort_by(by_message);
    fortunes
}

/// Render the fortune table.
pub fn render(fortunes: &[Fortune]) -> BenchResult<String> {
    let mut html = String::with_capacity(PAGE_HEAD.len() + PAGE_TAIL.len() + fortunes.len() * 96);
    html.push_str(PAGE_HEAD);
    for fortune in fortunes {
        write!(html, "<tr><td>{}</td><td>", fortune.id)?;
        escape_html(&mut html, &fortune.message);
        html.push_str("</td></tr>");
    }
    html.push_str(PAGE_TAIL);
    Ok(html)
}

/// Read, assemble and render the fortune page.
pub async fn fortunes_page(store: &RowStore) -> BenchResult<String> {
    let fortunes = store.fetch_all_fortunes().await?;
    render(&assemble(fortunes))
}

/// Escape text for use inside an HTML element.
pub fn escape_html(out: &mut String, text: &str) {
    let mut last = 0;
    for (index, byte) in text.bytes().enumerate() {
        let entity = match byte {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&#34;",
            b'\'' => "&#39;",
            _ => continue,
        };
        out.push_str(&text[last..index]);
        out.push_str(entity);
        last = index + 1;
    }
    out.push_str(&text[last..]);
}
