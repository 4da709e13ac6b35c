//! Brother web console toner gauges.
//!
//! `general/status.html` draws each cartridge as an image whose pixel
//! height is the remaining percentage. The gauge table has a row of
//! images followed by a row of colour labels.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::Error;
use crate::findings::SupplyReading;
use crate::http::{Expect, HttpSession, Scheme};

pub const STATUS_PATH: &str = "/general/status.html";

static DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+").ok());
static STYLE_HEIGHT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)height\s*:\s*(\d+)").ok());

/// Fetch the status page over plain HTTP and read its gauges.
pub async fn read_supplies(session: HttpSession, address: &str) -> Result<Vec<SupplyReading>, Error> {
    let mut session = session.with_schemes(&[Scheme::Http]);
    let fetched = session.fetch_first(address, &[STATUS_PATH], Expect::Markup).await?;
    Ok(parse_status_page(&fetched.body))
}

/// Gauges from a status page. A page without the gauge table yields no
/// readings rather than an error: the device answered.
pub fn parse_status_page(html: &str) -> Vec<SupplyReading> {
    let document = Html::parse_document(html);
    let Some(table) = ["table#inkLevel", "table#inkLevelMono"]
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|sel| document.select(&sel).next())
    else {
        return Vec::new();
    };

    let rows: Vec<ElementRef<'_>> = Selector::parse("tr")
        .map(|sel| table.select(&sel).collect())
        .unwrap_or_default();
    let (Some(levels), Some(labels)) = (rows.get(1), rows.get(2)) else {
        return Vec::new();
    };

    let heights: Vec<Option<u8>> = child_elements(*levels, "td")
        .into_iter()
        .map(gauge_height)
        .collect();
    let colors: Vec<String> = child_elements(*labels, "th")
        .into_iter()
        .filter_map(|th| normalize_label(&th.text().collect::<String>()))
        .collect();

    colors
        .into_iter()
        .zip(heights)
        .map(|(color, percent)| SupplyReading { color, percent })
        .collect()
}

fn child_elements<'a>(row: ElementRef<'a>, name: &str) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == name)
        .collect()
}

/// Pixel height of the gauge in a cell: the image's `height` attribute or
/// inline style, then the cell's own.
fn gauge_height(cell: ElementRef<'_>) -> Option<u8> {
    let image = Selector::parse("img")
        .ok()
        .and_then(|sel| cell.select(&sel).next());
    image
        .and_then(element_height)
        .or_else(|| element_height(cell))
        .map(|h| u8::try_from(h.min(100)).unwrap_or(100))
}

fn element_height(el: ElementRef<'_>) -> Option<u32> {
    let attr = el
        .value()
        .attr("height")
        .and_then(|h| DIGITS.as_ref()?.find(h))
        .and_then(|m| m.as_str().parse().ok());
    attr.or_else(|| {
        let style = el.value().attr("style")?;
        STYLE_HEIGHT
            .as_ref()?
            .captures(style)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    })
}

/// Map a gauge caption to a colour name. Unrecognised captions are kept
/// as their letters, uppercased.
pub fn normalize_label(text: &str) -> Option<String> {
    let letters: String = text
        .chars()
        .filter(char::is_ascii_alphabetic)
        .collect::<String>()
        .to_ascii_uppercase();
    let color = match letters.as_str() {
        "" => return None,
        "BK" | "K" | "BLK" | "BLACK" => "Black",
        "C" | "CYAN" => "Cyan",
        "M" | "MAGENTA" => "Magenta",
        "Y" | "YELLOW" => "Yellow",
        other => return Some(other.to_owned()),
    };
    Some(color.to_owned())
}
