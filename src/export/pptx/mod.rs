// src/export/pptx/mod.rs

mod parts;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Seek, Write},
    path::Path,
};
use tracing::{info, instrument};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{chart::Chart, normalize::format_number, normalize::NormalizedTable};
use parts::{EMU_PER_INCH, SLIDE_CX};

/// Data rows on a table slide unless the caller asks otherwise.
pub const DEFAULT_MAX_TABLE_ROWS: usize = 14;

const ROW_HEIGHT: i64 = 320_040;

#[derive(Debug, Clone, PartialEq)]
enum Slide {
    Cover {
        title: String,
        subtitle: String,
    },
    Text {
        title: String,
        lines: Vec<String>,
    },
    Table {
        title: String,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

/// Accumulates slides, then writes them as a `.pptx` package.
#[derive(Debug, Clone)]
pub struct DeckBuilder {
    title: String,
    created: DateTime<Utc>,
    slides: Vec<Slide>,
}

impl DeckBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            created: Utc::now(),
            slides: Vec::new(),
        }
    }

    /// Fix the creation timestamp recorded in the package properties.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn cover_slide(&mut self, title: &str, subtitle: &str) -> &mut Self {
        self.slides.push(Slide::Cover {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
        });
        self
    }

    pub fn text_slide(&mut self, title: &str, lines: &[String]) -> &mut Self {
        self.slides.push(Slide::Text {
            title: title.to_string(),
            lines: lines.to_vec(),
        });
        self
    }

    /// Header plus the first `max_rows` data rows (all rows for `None`).
    /// Missing numbers render as empty cells.
    pub fn table_slide(
        &mut self,
        title: &str,
        table: &NormalizedTable,
        max_rows: Option<usize>,
    ) -> &mut Self {
        let shown = match max_rows {
            Some(n) => Cow::Owned(table.head(n)),
            None => Cow::Borrowed(table),
        };
        let header = shown.column_names().iter().map(|s| s.to_string()).collect();
        let rows = (0..shown.num_rows())
            .map(|row| shown.columns().iter().map(|c| c.data.display(row)).collect())
            .collect();
        self.slides.push(Slide::Table {
            title: title.to_string(),
            header,
            rows,
        });
        self
    }

    /// The chart's series as a two-column category/value table.
    pub fn chart_slide(&mut self, chart: &Chart) -> &mut Self {
        self.slides.push(Slide::Table {
            title: chart.title.clone(),
            header: vec![chart.x_label.clone(), chart.y_label.clone()],
            rows: chart
                .points
                .iter()
                .map(|(label, value)| vec![label.clone(), format_number(*value)])
                .collect(),
        });
        self
    }

    /// Write the package into `writer` and hand it back.
    #[instrument(level = "debug", skip_all, fields(slides = self.slides.len()))]
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let n = self.slides.len();

        let mut put = |name: &str, body: String| -> Result<()> {
            zip.start_file(name, options)
                .with_context(|| format!("starting package part {}", name))?;
            zip.write_all(body.as_bytes())
                .with_context(|| format!("writing package part {}", name))?;
            Ok(())
        };

        put("[Content_Types].xml", parts::content_types(n))?;
        put("_rels/.rels", parts::root_rels())?;
        put(
            "docProps/core.xml",
            parts::core_props(
                &escape(self.title.as_str()),
                &self.created.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ),
        )?;
        put("ppt/presentation.xml", parts::presentation(n))?;
        put("ppt/_rels/presentation.xml.rels", parts::presentation_rels(n))?;
        put("ppt/slideMasters/slideMaster1.xml", parts::slide_master())?;
        put("ppt/slideMasters/_rels/slideMaster1.xml.rels", parts::master_rels())?;
        put("ppt/slideLayouts/slideLayout1.xml", parts::slide_layout())?;
        put("ppt/slideLayouts/_rels/slideLayout1.xml.rels", parts::layout_rels())?;
        put("ppt/theme/theme1.xml", parts::theme())?;
        for (idx, slide) in self.slides.iter().enumerate() {
            let num = idx + 1;
            put(&format!("ppt/slides/slide{}.xml", num), render_slide(slide))?;
            put(
                &format!("ppt/slides/_rels/slide{}.xml.rels", num),
                parts::slide_rels(),
            )?;
        }

        zip.finish().context("finalizing pptx archive")
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = self.write_to(BufWriter::new(file))?;
        out.flush()
            .with_context(|| format!("flushing {}", path.display()))?;
        info!(path = %path.display(), slides = self.slides.len(), "wrote deck");
        Ok(())
    }
}

fn inches(v: f64) -> i64 {
    (v * EMU_PER_INCH as f64) as i64
}

fn run(text: &str, size: u32, bold: bool) -> String {
    if text.is_empty() {
        return format!(r#"<a:p><a:endParaRPr lang="pt-BR" sz="{}"/></a:p>"#, size);
    }
    format!(
        r#"<a:p><a:r><a:rPr lang="pt-BR" sz="{}" b="{}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
        size,
        u8::from(bold),
        escape(text)
    )
}

fn text_box(id: u32, name: &str, (x, y, cx, cy): (i64, i64, i64, i64), paragraphs: &str) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>"#,
            r#"<p:txBody><a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paras}</p:txBody></p:sp>"#
        ),
        id = id,
        name = name,
        x = x,
        y = y,
        cx = cx,
        cy = cy,
        paras = paragraphs
    )
}

fn table_frame(header: &[String], rows: &[Vec<String>]) -> String {
    let cols = header.len().max(1);
    let width = inches(9.0);
    let col_w = width / cols as i64;
    let grid: String = (0..cols)
        .map(|_| format!(r#"<a:gridCol w="{}"/>"#, col_w))
        .collect();

    let cell = |text: &str, bold: bool| {
        format!(
            r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr/></a:tc>"#,
            run(text, 1000, bold)
        )
    };
    let row = |cells: &[String], bold: bool| {
        let tcs: String = (0..cols)
            .map(|i| cell(cells.get(i).map(String::as_str).unwrap_or(""), bold))
            .collect();
        format!(r#"<a:tr h="{}">{}</a:tr>"#, ROW_HEIGHT, tcs)
    };

    let mut trs = row(header, true);
    for r in rows {
        trs.push_str(&row(r, false));
    }

    format!(
        concat!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="3" name="Tabela"/>"#,
            r#"<p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>"#,
            r#"<p:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></p:xfrm>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">"#,
            r#"<a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{grid}</a:tblGrid>{trs}</a:tbl>"#,
            "</a:graphicData></a:graphic></p:graphicFrame>"
        ),
        x = inches(0.5),
        y = inches(1.5),
        cx = col_w * cols as i64,
        cy = ROW_HEIGHT * (rows.len() as i64 + 1),
        grid = grid,
        trs = trs
    )
}

fn title_box(title: &str) -> String {
    text_box(
        2,
        "Título",
        (inches(0.5), inches(0.3), SLIDE_CX - inches(1.0), inches(1.0)),
        &run(title, 2800, true),
    )
}

fn render_slide(slide: &Slide) -> String {
    let shapes = match slide {
        Slide::Cover { title, subtitle } => {
            let title = text_box(
                2,
                "Título",
                (inches(0.75), inches(2.5), SLIDE_CX - inches(1.5), inches(1.25)),
                &run(title, 4000, true),
            );
            let subtitle = text_box(
                3,
                "Subtítulo",
                (inches(0.75), inches(3.9), SLIDE_CX - inches(1.5), inches(0.9)),
                &run(subtitle, 2000, false),
            );
            title + &subtitle
        }
        Slide::Text { title, lines } => {
            let body: String = lines.iter().map(|l| run(l, 2000, false)).collect();
            title_box(title)
                + &text_box(
                    3,
                    "Texto",
                    (inches(1.0), inches(1.5), inches(8.0), inches(4.5)),
                    &body,
                )
        }
        Slide::Table {
            title,
            header,
            rows,
        } => title_box(title) + &table_frame(header, rows),
    };
    parts::slide(&shapes)
}
