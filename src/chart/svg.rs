// src/chart/svg.rs
//
// Bare SVG rendering: axes, bars or a polyline, labels. No styling beyond that.

use quick_xml::escape::escape;
use std::fmt::Write;

use super::{Chart, ChartKind};
use crate::normalize::format_number;

const MARGIN: f64 = 48.0;
const BAR_FILL: &str = "#2b6cb0";

impl Chart {
    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let (w, h) = (width as f64, height as f64);
        let plot_w = (w - 2.0 * MARGIN).max(1.0);
        let plot_h = (h - 2.0 * MARGIN).max(1.0);
        let max = self.max_value();
        let scale = if max > 0.0 { plot_h / max } else { 0.0 };
        let n = self.points.len().max(1) as f64;
        let step = plot_w / n;
        let base_y = MARGIN + plot_h;

        let mut out = String::new();
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        );
        let _ = writeln!(
            out,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="16">{}</text>"#,
            w / 2.0,
            MARGIN / 2.0,
            escape(self.title.as_str())
        );
        let _ = writeln!(
            out,
            r#"<path d="M{m} {m} V{b} H{r}" fill="none" stroke="black"/>"#,
            m = MARGIN,
            b = base_y,
            r = MARGIN + plot_w
        );

        match self.kind {
            ChartKind::Bar => {
                for (i, (label, value)) in self.points.iter().enumerate() {
                    let bar_h = value.max(0.0) * scale;
                    let x = MARGIN + i as f64 * step + step * 0.1;
                    let _ = writeln!(
                        out,
                        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {}</title></rect>"#,
                        x,
                        base_y - bar_h,
                        step * 0.8,
                        bar_h,
                        BAR_FILL,
                        escape(label.as_str()),
                        format_number(*value)
                    );
                    self.write_x_label(&mut out, label, x + step * 0.4, base_y);
                }
            }
            ChartKind::Line => {
                let coords: Vec<String> = self
                    .points
                    .iter()
                    .enumerate()
                    .map(|(i, (_, v))| {
                        let x = MARGIN + i as f64 * step + step / 2.0;
                        format!("{:.1},{:.1}", x, base_y - v.max(0.0) * scale)
                    })
                    .collect();
                let _ = writeln!(
                    out,
                    r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
                    coords.join(" "),
                    BAR_FILL
                );
                for (i, (label, _)) in self.points.iter().enumerate() {
                    let x = MARGIN + i as f64 * step + step / 2.0;
                    self.write_x_label(&mut out, label, x, base_y);
                }
            }
        }

        out.push_str("</svg>\n");
        out
    }

    fn write_x_label(&self, out: &mut String, label: &str, x: f64, base_y: f64) {
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">{}</text>"#,
            x,
            base_y + 14.0,
            escape(label)
        );
    }
}
