//! Report generation tools
//!
//! Health status and vaccination coverage summaries, and a PDF report with
//! both tables and bar charts.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::*;
use serde::Serialize;
use tracing::info;

use crate::access::{Caller, Permission};
use crate::db::Database;
use crate::models::{Animal, SpeciesCoverage, StatusCount, Vaccination};

use super::{authorize, ToolResult};

// ============================================================================
// Color Constants (RGB 0-255)
// ============================================================================

const COLOR_TITLE: (u8, u8, u8) = (0, 100, 60);
const COLOR_HEALTHY: (u8, u8, u8) = (0, 176, 80);
const COLOR_WATCH: (u8, u8, u8) = (255, 165, 0);
const COLOR_CRITICAL: (u8, u8, u8) = (192, 0, 0);
const COLOR_VACCINATED: (u8, u8, u8) = (0, 112, 192);
const COLOR_BLACK: (u8, u8, u8) = (0, 0, 0);
const COLOR_GRAY: (u8, u8, u8) = (128, 128, 128);

/// Horizontal units per category on a bar chart
const BAR_SLOT: i32 = 10;

// ============================================================================
// Response Types
// ============================================================================

/// Response for health_status_report
#[derive(Debug, Serialize)]
pub struct HealthStatusReport {
    pub statuses: Vec<StatusCount>,
    pub total_animals: i64,
}

/// Response for vaccination_report
#[derive(Debug, Serialize)]
pub struct VaccinationReport {
    pub species: Vec<SpeciesCoverage>,
    pub total_vaccinated: i64,
    pub total_not_vaccinated: i64,
}

/// Response for generate_health_report
#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub success: bool,
    pub file_path: String,
    pub total_animals: i64,
    pub species_count: usize,
    pub message: String,
}

/// Color used for a health status
pub fn status_color(status: &str) -> (u8, u8, u8) {
    match status.trim().to_lowercase().as_str() {
        "healthy" => COLOR_HEALTHY,
        "sick" | "critical" | "deceased" => COLOR_CRITICAL,
        "injured" | "recovering" | "under observation" => COLOR_WATCH,
        _ => COLOR_GRAY,
    }
}

fn coverage_percent(row: &SpeciesCoverage) -> f64 {
    let total = row.vaccinated + row.not_vaccinated;
    if total == 0 {
        0.0
    } else {
        row.vaccinated as f64 * 100.0 / total as f64
    }
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Number of animals per health status
pub fn health_status_report(db: &Database, caller: &Caller) -> ToolResult<HealthStatusReport> {
    authorize(caller, Permission::ViewReports)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let statuses = Animal::count_by_status(&conn)
        .map_err(|e| format!("Failed to build health status report: {}", e))?;
    let total_animals = statuses.iter().map(|s| s.count).sum();

    Ok(HealthStatusReport { statuses, total_animals })
}

/// Vaccinated and unvaccinated animals per species
pub fn vaccination_report(db: &Database, caller: &Caller) -> ToolResult<VaccinationReport> {
    authorize(caller, Permission::ViewReports)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let species = Vaccination::coverage_by_species(&conn)
        .map_err(|e| format!("Failed to build vaccination report: {}", e))?;
    let total_vaccinated = species.iter().map(|s| s.vaccinated).sum();
    let total_not_vaccinated = species.iter().map(|s| s.not_vaccinated).sum();

    Ok(VaccinationReport {
        species,
        total_vaccinated,
        total_not_vaccinated,
    })
}

// ============================================================================
// Chart Generation (plotters)
// ============================================================================

/// One colored bar per category, grouped side by side
struct BarSeries<'a> {
    label: &'a str,
    color: (u8, u8, u8),
    values: Vec<i64>,
}

/// Render a grouped bar chart into an RGB image
fn render_bar_chart(
    categories: &[String],
    series: &[BarSeries],
    y_desc: &str,
    width: u32,
    height: u32,
) -> Result<DynamicImage, String> {
    use plotters::prelude::*;

    if categories.is_empty() || series.is_empty() {
        return Err("No data to chart".to_string());
    }

    let y_max = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .max()
        .unwrap_or(0)
        .max(1);
    let x_max = categories.len() as i32 * BAR_SLOT;
    let bar_width = (BAR_SLOT - 2) / series.len() as i32;

    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0..x_max, 0..(y_max + 1))
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(x_max as usize + 1)
            .x_label_formatter(&|x| {
                if x % BAR_SLOT == BAR_SLOT / 2 {
                    categories
                        .get((x / BAR_SLOT) as usize)
                        .cloned()
                        .unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .y_desc(y_desc)
            .draw()
            .map_err(|e| e.to_string())?;

        for (offset, s) in series.iter().enumerate() {
            let color = RGBColor(s.color.0, s.color.1, s.color.2);
            let bars = s.values.iter().enumerate().map(|(i, value)| {
                let x0 = i as i32 * BAR_SLOT + 1 + offset as i32 * bar_width;
                Rectangle::new([(x0, 0), (x0 + bar_width, *value)], color.filled())
            });

            chart
                .draw_series(bars)
                .map_err(|e| e.to_string())?
                .label(s.label)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        if series.len() > 1 {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(|e| e.to_string())?;
        }

        root.present().map_err(|e| e.to_string())?;
    }

    let img = RgbImage::from_raw(width, height, buffer).ok_or("Failed to create image from buffer")?;
    Ok(DynamicImage::ImageRgb8(img))
}

/// Animals per health status, one bar each
fn health_status_chart(statuses: &[StatusCount]) -> Result<DynamicImage, String> {
    let categories: Vec<String> = statuses.iter().map(|s| s.status.clone()).collect();
    let series = [BarSeries {
        label: "Animals",
        color: COLOR_HEALTHY,
        values: statuses.iter().map(|s| s.count).collect(),
    }];
    render_bar_chart(&categories, &series, "Animals", 1000, 400)
}

/// Vaccinated vs not vaccinated per species
fn vaccination_chart(species: &[SpeciesCoverage]) -> Result<DynamicImage, String> {
    let categories: Vec<String> = species.iter().map(|s| s.species.clone()).collect();
    let series = [
        BarSeries {
            label: "Vaccinated",
            color: COLOR_VACCINATED,
            values: species.iter().map(|s| s.vaccinated).collect(),
        },
        BarSeries {
            label: "Not vaccinated",
            color: COLOR_CRITICAL,
            values: species.iter().map(|s| s.not_vaccinated).collect(),
        },
    ];
    render_bar_chart(&categories, &series, "Animals", 1000, 400)
}

// ============================================================================
// PDF Generation Helper Functions
// ============================================================================

fn rgb_to_printpdf(color: (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        color.0 as f32 / 255.0,
        color.1 as f32 / 255.0,
        color.2 as f32 / 255.0,
        None,
    ))
}

fn add_text(layer: &PdfLayerReference, font: &IndirectFontRef, text: &str, x: f32, y: f32, size: f32, color: (u8, u8, u8)) {
    layer.set_fill_color(rgb_to_printpdf(color));
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

fn add_rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.set_outline_color(rgb_to_printpdf(COLOR_GRAY));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![(Point::new(Mm(x1), Mm(y)), false), (Point::new(Mm(x2), Mm(y)), false)],
        is_closed: false,
    });
}

/// Place a chart with its top edge at `top`
fn add_chart(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    chart: Result<DynamicImage, String>,
    x: f32,
    top: f32,
) {
    match chart {
        Ok(image) => {
            // 1000x400 px at 150 DPI is about 169mm x 68mm
            let transform = ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(top - 68.0)),
                dpi: Some(150.0),
                ..Default::default()
            };
            Image::from_dynamic_image(&image).add_to_layer(layer.clone(), transform);
        }
        Err(e) => {
            add_text(layer, font, &format!("Chart generation error: {}", e), x, top - 10.0, 9.0, COLOR_CRITICAL);
        }
    }
}

/// Write the health and vaccination report to a PDF file
pub fn generate_health_report(db: &Database, caller: &Caller, output_path: &str) -> ToolResult<GenerateReportResponse> {
    authorize(caller, Permission::ViewReports)?;

    let (statuses, species) = {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        let statuses = Animal::count_by_status(&conn).map_err(|e| e.to_string())?;
        let species = Vaccination::coverage_by_species(&conn).map_err(|e| e.to_string())?;
        (statuses, species)
    };

    let total_animals: i64 = statuses.iter().map(|s| s.count).sum();
    if total_animals == 0 {
        return Err("No animals on record; nothing to report".into());
    }
    let total_vaccinated: i64 = species.iter().map(|s| s.vaccinated).sum();

    let (doc, page1, layer1) = PdfDocument::new("Animal Health Report", Mm(215.9), Mm(279.4), "Layer 1");

    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| e.to_string())?;
    let font_bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| e.to_string())?;

    let margin = 15.0;

    // Page 1: health status
    let layer = doc.get_page(page1).get_layer(layer1);
    let mut y = 279.4 - 20.0;

    add_text(&layer, &font_bold, "Animal Health Report", margin, y, 18.0, COLOR_TITLE);
    y -= 10.0;
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    add_text(&layer, &font, &format!("Generated: {}", now), margin, y, 11.0, COLOR_BLACK);
    add_text(&layer, &font, &format!("Animals: {}", total_animals), 120.0, y, 11.0, COLOR_BLACK);
    y -= 6.0;
    add_text(
        &layer,
        &font,
        &format!("Vaccinated: {} of {}", total_vaccinated, total_animals),
        margin,
        y,
        11.0,
        COLOR_BLACK,
    );
    y -= 8.0;
    add_rule(&layer, margin, 200.0, y);
    y -= 10.0;

    add_text(&layer, &font_bold, "Health Status", margin, y, 12.0, COLOR_BLACK);
    y -= 7.0;
    let col_x = [margin, 80.0, 120.0];
    for (x, header) in col_x.iter().zip(["Status", "Animals", "Share"]) {
        add_text(&layer, &font_bold, header, *x, y, 9.0, COLOR_BLACK);
    }
    y -= 5.0;
    for row in &statuses {
        let color = status_color(&row.status);
        let share = row.count as f64 * 100.0 / total_animals as f64;
        add_text(&layer, &font, &row.status, col_x[0], y, 9.0, color);
        add_text(&layer, &font, &row.count.to_string(), col_x[1], y, 9.0, COLOR_BLACK);
        add_text(&layer, &font, &format!("{:.0}%", share), col_x[2], y, 9.0, COLOR_BLACK);
        y -= 4.5;
    }
    y -= 6.0;
    add_chart(&layer, &font, health_status_chart(&statuses), margin, y);

    // Page 2: vaccination coverage
    let (page2, layer2) = doc.add_page(Mm(215.9), Mm(279.4), "Vaccinations");
    let layer2 = doc.get_page(page2).get_layer(layer2);
    let mut y2 = 279.4 - 20.0;

    add_text(&layer2, &font_bold, "Vaccination Coverage", margin, y2, 16.0, COLOR_TITLE);
    y2 -= 10.0;
    let col_x = [margin, 80.0, 115.0, 160.0];
    for (x, header) in col_x.iter().zip(["Species", "Vaccinated", "Not vaccinated", "Coverage"]) {
        add_text(&layer2, &font_bold, header, *x, y2, 9.0, COLOR_BLACK);
    }
    y2 -= 5.0;
    for row in &species {
        let coverage = coverage_percent(row);
        let color = if row.not_vaccinated == 0 { COLOR_HEALTHY } else { COLOR_BLACK };
        add_text(&layer2, &font, &row.species, col_x[0], y2, 9.0, COLOR_BLACK);
        add_text(&layer2, &font, &row.vaccinated.to_string(), col_x[1], y2, 9.0, COLOR_BLACK);
        add_text(&layer2, &font, &row.not_vaccinated.to_string(), col_x[2], y2, 9.0, COLOR_BLACK);
        add_text(&layer2, &font, &format!("{:.0}%", coverage), col_x[3], y2, 9.0, color);
        y2 -= 4.5;
    }
    y2 -= 6.0;
    add_chart(&layer2, &font, vaccination_chart(&species), margin, y2);

    let path = Path::new(output_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(|e| e.to_string())?;

    info!(path = output_path, animals = total_animals, "Health report generated");

    Ok(GenerateReportResponse {
        success: true,
        file_path: output_path.to_string(),
        total_animals,
        species_count: species.len(),
        message: format!(
            "Health report generated for {} animals across {} species",
            total_animals,
            species.len()
        ),
    })
}
