//! Panel view
//!
//! What the panel shows after an update, and the markup that replaces the
//! shadow root content.

use super::payload::PanelData;

/// Rendered when the dates sensor lists no common dates
pub const NO_DATES_MESSAGE: &str = "No dates available";

const PANEL_STYLE: &str = r#"<style>
  ha-card { width: 100%; padding: 16px; }
  .card-content { padding: 16px; }
  .date-selector { margin-bottom: 16px; }
  .chart-container { height: 300px; width: 100%; }
</style>"#;

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub title: String,
    pub dates: Vec<String>,
    /// Last date the user picked, if it is still offered
    pub selected_date: Option<String>,
    pub power_available: bool,
    pub gas_available: bool,
}

impl PanelView {
    pub fn new(title: &str, data: &PanelData, selected_date: Option<String>) -> Self {
        let dates = data.dates.common.clone();
        let selected_date = selected_date.filter(|d| dates.contains(d));

        Self {
            title: title.to_string(),
            dates,
            selected_date,
            power_available: !data.power.is_empty(),
            gas_available: !data.gas.is_empty(),
        }
    }

    /// Full shadow root markup
    pub fn to_html(&self) -> String {
        format!(
            r#"<ha-card header="{title}">
  <div class="card-content">
    {selector}
    {chart}
  </div>
</ha-card>
{style}"#,
            title = escape_html(&self.title),
            selector = self.date_selector_html(),
            chart = self.chart_html(),
            style = PANEL_STYLE,
        )
    }

    fn date_selector_html(&self) -> String {
        if self.dates.is_empty() {
            return NO_DATES_MESSAGE.to_string();
        }

        let options: String = self
            .dates
            .iter()
            .map(|date| {
                let selected = if self.selected_date.as_deref() == Some(date.as_str()) {
                    " selected"
                } else {
                    ""
                };
                let date = escape_html(date);
                format!(r#"<option value="{date}"{selected}>{date}</option>"#)
            })
            .collect();

        format!(
            r#"<div class="date-selector"><select id="date-select">{}</select></div>"#,
            options
        )
    }

    fn chart_html(&self) -> String {
        format!(
            r#"<div class="chart-container"><div id="energy-chart"><p>Power data available: {}</p><p>Gas data available: {}</p></div></div>"#,
            yes_no(self.power_available),
            yes_no(self.gas_available),
        )
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Escape text for use inside element content or a quoted attribute
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor_panel::payload::AvailableDates;

    fn data_with_dates(common: &[&str]) -> PanelData {
        PanelData {
            dates: AvailableDates {
                common: common.iter().map(|d| d.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_options_in_order() {
        let view = PanelView::new(
            "Energy Panel",
            &data_with_dates(&["2024-01-01", "2024-01-02"]),
            None,
        );
        let html = view.to_html();

        assert_eq!(html.matches("<option").count(), 2);
        let first = html.find(r#"value="2024-01-01""#).unwrap();
        let second = html.find(r#"value="2024-01-02""#).unwrap();
        assert!(first < second);
        assert!(!html.contains(NO_DATES_MESSAGE));
    }

    #[test]
    fn test_empty_dates_message() {
        let html = PanelView::new("Energy Panel", &data_with_dates(&[]), None).to_html();
        assert!(html.contains("No dates available"));
        assert!(!html.contains("<select"));
    }

    #[test]
    fn test_selected_date_kept_only_when_offered() {
        let data = data_with_dates(&["2024-01-01", "2024-01-02"]);

        let view = PanelView::new("t", &data, Some("2024-01-02".to_string()));
        assert!(view
            .to_html()
            .contains(r#"<option value="2024-01-02" selected>"#));

        let view = PanelView::new("t", &data, Some("2023-12-31".to_string()));
        assert_eq!(view.selected_date, None);
    }

    #[test]
    fn test_title_escaped() {
        let html = PanelView::new(r#"Gas & "Power""#, &PanelData::default(), None).to_html();
        assert!(html.contains(r#"header="Gas &amp; &quot;Power&quot;""#));
        assert!(html.contains("Power data available: No"));
    }
}
