use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::chart::{CategoryChartData, ChartData, XyChartData};

/// Generate the XLSX workbook embedded behind a chart.
///
/// The cell layout matches the references written into the chart part:
/// category charts put labels in column A and one column per series, scatter
/// charts use an X/Y column pair per series. Row 1 holds series names.
pub fn generate_chart_workbook(data: &ChartData) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Sheet1")
        .context("Failed to name chart data sheet")?;

    match data {
        ChartData::Category(data) => write_category_data(worksheet, data)?,
        ChartData::Xy(data) => write_xy_data(worksheet, data)?,
    }

    worksheet.autofit();

    let bytes = workbook
        .save_to_buffer()
        .context("Failed to save workbook to buffer")?;

    Ok(bytes)
}

fn write_category_data(worksheet: &mut Worksheet, data: &CategoryChartData) -> Result<()> {
    let header_format = Format::new().set_bold();

    for (row_idx, category) in data.categories.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        worksheet
            .write_string(excel_row, 0, category)
            .with_context(|| format!("Failed to write category at row {excel_row}"))?;
    }

    for (series_idx, series) in data.series.iter().enumerate() {
        let col = (series_idx + 1) as u16;
        worksheet
            .write_string_with_format(0, col, &series.name, &header_format)
            .with_context(|| format!("Failed to write series name at column {col}"))?;

        for (row_idx, value) in series.values.iter().enumerate() {
            // Gaps stay as empty cells.
            let Some(value) = value else { continue };
            let excel_row = (row_idx + 1) as u32;
            worksheet
                .write_number(excel_row, col, *value)
                .with_context(|| format!("Failed to write number at ({excel_row}, {col})"))?;
        }
    }

    Ok(())
}

fn write_xy_data(worksheet: &mut Worksheet, data: &XyChartData) -> Result<()> {
    let header_format = Format::new().set_bold();

    for (series_idx, series) in data.series.iter().enumerate() {
        let x_col = (series_idx * 2) as u16;
        let y_col = x_col + 1;

        worksheet
            .write_string_with_format(0, x_col, "X-Values", &header_format)
            .with_context(|| format!("Failed to write header at column {x_col}"))?;
        worksheet
            .write_string_with_format(0, y_col, &series.name, &header_format)
            .with_context(|| format!("Failed to write series name at column {y_col}"))?;

        for (row_idx, (x, y)) in series.points.iter().enumerate() {
            let excel_row = (row_idx + 1) as u32;
            worksheet
                .write_number(excel_row, x_col, *x)
                .with_context(|| format!("Failed to write x at ({excel_row}, {x_col})"))?;
            worksheet
                .write_number(excel_row, y_col, *y)
                .with_context(|| format!("Failed to write y at ({excel_row}, {y_col})"))?;
        }
    }

    Ok(())
}
