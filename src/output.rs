// src/output.rs - CSV and JSON export of feature records and classifications

use csv::Writer;
use serde::Serialize;
use std::io::Write;

use crate::classifier::{ClassificationResult, ClassificationStatus};
use crate::dimension::ScaleStatus;
use crate::errors::{FractalError, Result};
use crate::feature_extraction::FractalFeatureRecord;
use crate::knowledge_base::{cluster_name, CLUSTER_COUNT};

/// Write one row per labelled feature record.
///
/// `local_dimensions` is spread over `Local_Dim_<i>` columns, sized by the
/// first record.
pub fn write_features_csv<W: Write>(records: &[(String, FractalFeatureRecord)], out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    let local_count = records.first().map_or(0, |(_, r)| r.local_dimensions.len());

    let mut header: Vec<String> = [
        "Label",
        "Hausdorff_Dimension",
        "R_Squared",
        "Valid_Scales",
        "Dimension_Status",
        "Dimension_Variance",
        "Dimension_Complexity",
        "Fractal_Type",
        "Contour_Count",
        "Total_Perimeter",
        "Avg_Area",
        "Contour_Complexity",
        "Circularity_Mean",
        "Circularity_Std",
        "Convexity_Mean",
        "Aspect_Ratio_Mean",
        "Contour_Hierarchy_Depth",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend((0..local_count).map(|i| format!("Local_Dim_{}", i)));
    writer.write_record(&header)?;

    for (label, record) in records {
        if record.local_dimensions.len() != local_count {
            return Err(FractalError::MalformedFeatureInput {
                feature: "local_dimensions".to_string(),
                reason: format!(
                    "record '{}' has {} entries, expected {}",
                    label,
                    record.local_dimensions.len(),
                    local_count
                ),
            });
        }

        let mut row = vec![
            label.clone(),
            format!("{:.6}", record.hausdorff_dimension),
            format!("{:.6}", record.r_squared),
            record.valid_scales.to_string(),
            scale_status_label(record.dimension_status).to_string(),
            format!("{:.6}", record.dimension_variance),
            format!("{:.6}", record.dimension_complexity),
            record.fractal_type.to_string(),
            record.contour_count.to_string(),
            format!("{:.6}", record.total_perimeter),
            format!("{:.6}", record.avg_area),
            format!("{:.6}", record.contour_complexity),
            format!("{:.6}", record.circularity_mean),
            format!("{:.6}", record.circularity_std),
            format!("{:.6}", record.convexity_mean),
            format!("{:.6}", record.aspect_ratio_mean),
            record.contour_hierarchy_depth.to_string(),
        ];
        row.extend(record.local_dimensions.iter().map(|d| format!("{:.6}", d)));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write one row per labelled classification with all ten cluster scores
pub fn write_classifications_csv<W: Write>(results: &[(String, ClassificationResult)], out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);

    let mut header: Vec<String> = ["Label", "Cluster_Id", "Cluster_Name", "Confidence", "Status"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend((0..CLUSTER_COUNT).map(|id| format!("Score_{}", id)));
    writer.write_record(&header)?;

    for (label, result) in results {
        let status = match result.status {
            ClassificationStatus::Classified => "classified",
            ClassificationStatus::FailedClosed => "failed_closed",
        };
        let mut row = vec![
            label.clone(),
            result.cluster_id.to_string(),
            cluster_name(result.cluster_id),
            format!("{:.6}", result.confidence),
            status.to_string(),
        ];
        row.extend((0..CLUSTER_COUNT).map(|id| {
            format!("{:.6}", result.scores.get(&id).copied().unwrap_or(0.0))
        }));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Serialize any result as JSON followed by a newline
pub fn write_json<W: Write, T: Serialize>(value: &T, mut out: W, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn scale_status_label(status: ScaleStatus) -> &'static str {
    match status {
        ScaleStatus::Ok => "ok",
        ScaleStatus::InsufficientScaleData => "insufficient_scale_data",
        ScaleStatus::Skipped => "skipped",
    }
}
