//! Visual companions for bucket reports.

use std::fmt::Write;

use ember_store::Artifact;
use ember_types::amount::format_signed_eth;
use ember_types::UsdAmount;

use crate::window::AggregateSnapshot;

/// Renders a bucket snapshot into a file attached to its report.
pub trait ArtifactRenderer: Send + Sync {
    fn render(&self, snapshot: &AggregateSnapshot, price: Option<UsdAmount>) -> Artifact;
}

const WIDTH: u32 = 1600;
const HEIGHT: u32 = 900;
const BAR_WIDTH: u32 = 120;
const GRAPH_HEIGHT: u32 = 400;
const GRAPH_TOP: u32 = 320;
const GRAPH_LEFT: u32 = 80;
const GRAPH_RIGHT: u32 = 1000;
const ISSUED_X: u32 = 200;
const BURNED_X: u32 = 400;
const TEXT_PAD: u32 = 8;

/// Largest burned bar, in thousandths of the issuance bar.
const MAX_BURN_RATIO_PERMILLE: u128 = 1_200;

const ISSUED_COLOUR: &str = "#4f7942";
const BURNED_COLOUR: &str = "#b23227";
const BACKGROUND: &str = "#181818";

/// Bar geometry in SVG units.
#[derive(Debug, PartialEq, Eq)]
struct Bars {
    /// Height of the issuance bar (the graph's scale).
    issued: u32,
    /// Height of the burned bar, capped at 1.2x `issued`.
    burned: u32,
}

impl Bars {
    fn for_snapshot(snapshot: &AggregateSnapshot) -> Self {
        let issuance = snapshot.issuance().raw();
        let ratio = if issuance == 0 {
            0
        } else {
            snapshot.burned.raw().saturating_mul(1_000) / issuance
        };
        let cap = GRAPH_HEIGHT as u128 * MAX_BURN_RATIO_PERMILLE / 1_000;
        if ratio > MAX_BURN_RATIO_PERMILLE {
            // Shrink the scale so the burned bar lands exactly on the cap.
            Self {
                issued: (GRAPH_HEIGHT as u128 * MAX_BURN_RATIO_PERMILLE / ratio) as u32,
                burned: cap as u32,
            }
        } else {
            Self {
                issued: GRAPH_HEIGHT,
                burned: (ratio * GRAPH_HEIGHT as u128 / 1_000) as u32,
            }
        }
    }

    /// Height of the net-issuance block under the burned line; zero when
    /// burn exceeded issuance.
    fn net(&self) -> u32 {
        self.issued.saturating_sub(self.burned)
    }
}

/// Issued-vs-burned bar chart as SVG.
#[derive(Clone, Copy, Debug, Default)]
pub struct SvgRenderer;

impl SvgRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render_svg(&self, snapshot: &AggregateSnapshot, price: Option<UsdAmount>) -> String {
        let bars = Bars::for_snapshot(snapshot);
        let bottom = GRAPH_TOP + bars.issued;
        let issued_mid = ISSUED_X + BAR_WIDTH / 2;
        let burned_mid = BURNED_X + BAR_WIDTH / 2;
        let burned_usd = price
            .map(|p| snapshot.burned.value_in_usd(p).format_compact())
            .unwrap_or_default();
        let cumulative_usd = price
            .map(|p| snapshot.cumulative_burned.value_in_usd(p).format_compact())
            .unwrap_or_default();

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}">"#
        );
        let _ = writeln!(
            svg,
            r#"<style>.txt {{ fill: white; font-family: Roboto Mono, monospace; }} .small {{ font-size: 20px; }} .header {{ font-size: 84px; }} .total {{ font-size: 96px; }}</style>"#
        );
        let _ = writeln!(svg, r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="{BACKGROUND}"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="250" y="180" class="txt header">{} ETH Burned</text>"#,
            snapshot.burned.format_eth(2)
        );
        let _ = writeln!(svg, r#"<text x="260" y="225" class="txt small">{burned_usd}</text>"#);
        let _ = writeln!(
            svg,
            r#"<text x="1580" y="40" class="txt small" text-anchor="end">{} Report | {}</text>"#,
            snapshot.bucket.kind_name(),
            snapshot.bucket.range()
        );

        // Issued bar: the net block sits at the bottom, the part eaten by burn above it.
        let _ = writeln!(
            svg,
            r#"<text x="{issued_mid}" y="{}" class="txt small" text-anchor="middle">Issued</text>"#,
            GRAPH_TOP - TEXT_PAD
        );
        let _ = writeln!(
            svg,
            r#"<rect x="{ISSUED_X}" y="{GRAPH_TOP}" width="{BAR_WIDTH}" height="{}" fill="{ISSUED_COLOUR}" opacity="0.25"/>"#,
            bars.burned.min(bars.issued)
        );
        let _ = writeln!(
            svg,
            r#"<rect x="{ISSUED_X}" y="{}" width="{BAR_WIDTH}" height="{}" fill="{ISSUED_COLOUR}"/>"#,
            bottom - bars.net(),
            bars.net()
        );
        let _ = writeln!(
            svg,
            r#"<text x="{issued_mid}" y="{}" class="txt small" text-anchor="middle">+{}</text>"#,
            GRAPH_TOP + 2 * TEXT_PAD + 16,
            snapshot.issuance().format_eth(2)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{issued_mid}" y="{}" class="txt small" text-anchor="middle">Net Change {}</text>"#,
            bottom + 3 * TEXT_PAD,
            format_signed_eth(snapshot.net_issuance(), 2)
        );

        // Burned bar hangs from the top line.
        let _ = writeln!(
            svg,
            r#"<text x="{burned_mid}" y="{}" class="txt small" text-anchor="middle">Burned</text>"#,
            GRAPH_TOP - TEXT_PAD
        );
        let _ = writeln!(
            svg,
            r#"<rect x="{BURNED_X}" y="{GRAPH_TOP}" width="{BAR_WIDTH}" height="{}" fill="{BURNED_COLOUR}"/>"#,
            bars.burned
        );
        let _ = writeln!(
            svg,
            r#"<text x="{burned_mid}" y="{}" class="txt small" text-anchor="middle">-{}</text>"#,
            GRAPH_TOP + bars.burned + 3 * TEXT_PAD,
            snapshot.burned.format_eth(2)
        );

        let _ = writeln!(
            svg,
            r#"<line x1="{GRAPH_LEFT}" y1="{GRAPH_TOP}" x2="{GRAPH_RIGHT}" y2="{GRAPH_TOP}" stroke="{BURNED_COLOUR}" stroke-width="4"/>"#
        );
        let _ = writeln!(
            svg,
            r#"<line x1="{GRAPH_LEFT}" y1="{bottom}" x2="{}" y2="{bottom}" stroke="{ISSUED_COLOUR}" stroke-width="4"/>"#,
            BURNED_X + BAR_WIDTH + 120
        );

        let _ = writeln!(
            svg,
            r#"<text x="1342" y="580" class="txt total" text-anchor="middle">{cumulative_usd}</text>"#
        );
        let _ = writeln!(
            svg,
            r#"<text x="1342" y="650" class="txt small" text-anchor="middle">Cumulative Burn</text>"#
        );
        let _ = writeln!(
            svg,
            r#"<text x="1342" y="688" class="txt small" text-anchor="middle">{} ETH</text>"#,
            snapshot.cumulative_burned.format_eth(2)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" class="txt small" text-anchor="end" opacity="0.65">Block Height: {}</text>"#,
            WIDTH - TEXT_PAD,
            HEIGHT - TEXT_PAD,
            snapshot.end_block
        );
        svg.push_str("</svg>\n");
        svg
    }
}

impl ArtifactRenderer for SvgRenderer {
    fn render(&self, snapshot: &AggregateSnapshot, price: Option<UsdAmount>) -> Artifact {
        Artifact {
            extension: "svg".into(),
            bytes: self.render_svg(snapshot, price).into_bytes(),
        }
    }
}
