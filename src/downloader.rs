use serde::Serialize;
use std::fmt::Write as _;

use crate::models::{Resource, ResourceType};
use crate::stats::{LeaderboardEntry, ResourceStats};

const MAX_FILE_NAME_LEN: usize = 80;

/// Size and type shown next to the download button
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PdfMeta {
    pub file_type: String,
    pub file_size: String,
}

/// Display metadata of a resource's mock PDF
///
/// The size is derived from the id and title so it stays stable between
/// page loads.
pub fn mock_pdf_meta(resource: &Resource) -> PdfMeta {
    let size_kb = 320 + (resource.id.chars().count() + resource.title.chars().count()) * 7;
    PdfMeta {
        file_type: "PDF".to_string(),
        file_size: format!("{} KB", size_kb),
    }
}

/// Name of the bundled sample document used for each resource type
pub fn mock_pdf_source(kind: ResourceType) -> &'static str {
    match kind {
        ResourceType::Notes => "notes-pack.pdf",
        ResourceType::Pyq => "pyq-pack.pdf",
        ResourceType::Assignment => "assignment-kit.pdf",
        ResourceType::Project => "notes-pack.pdf",
    }
}

/// Make a title safe to use as a file name
///
/// Removes characters that are reserved on common file systems, collapses
/// whitespace and caps the length.
pub fn sanitize_file_name(value: &str) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_FILE_NAME_LEN).collect();

    if truncated.trim().is_empty() {
        "resource".to_string()
    } else {
        truncated.trim_end().to_string()
    }
}

pub fn download_file_name(resource: &Resource) -> String {
    format!("{}.pdf", sanitize_file_name(&resource.title))
}

/// Escape text for a PDF string literal, replacing anything outside ASCII
fn pdf_text(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '(' | ')' | '\\' => format!("\\{}", c),
            c if c.is_ascii() && !c.is_ascii_control() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// Render a one-page PDF describing the resource
///
/// Stands in for the real document, which the platform does not store.
pub fn render_resource_pdf(resource: &Resource) -> Vec<u8> {
    let lines = [
        format!("Subject: {}", resource.subject),
        format!("Semester {} | {}", resource.semester, resource.resource_type),
        format!("Tags: {}", resource.tags.join(", ")),
        format!("Shared from {}", resource.college),
        String::new(),
        resource.description.clone(),
    ];

    let mut content = String::new();
    let _ = write!(
        content,
        "BT /F1 18 Tf 72 720 Td ({}) Tj ET\nBT /F1 11 Tf 72 690 Td 16 TL",
        pdf_text(&resource.title)
    );
    for line in &lines {
        let _ = write!(content, " ({}) Tj T*", pdf_text(line));
    }
    content.push_str(" ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (idx, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        let _ = write!(pdf, "{} 0 obj\n{}\nendobj\n", idx + 1, body);
    }

    let xref_at = pdf.len();
    let _ = write!(pdf, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(pdf, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        pdf,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    );

    pdf.into_bytes()
}

/// Quote a CSV field when it contains commas, quotes or newlines
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    let escaped: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    escaped.join(",")
}

/// Convert the leaderboard to CSV, one row per user in rank order
pub fn leaderboard_to_csv(entries: &[LeaderboardEntry]) -> String {
    let mut csv_content = String::from("rank,name,college,uploads,five_star_reviews,points\n");

    for (idx, entry) in entries.iter().enumerate() {
        csv_content.push_str(&csv_row(&[
            (idx + 1).to_string(),
            entry.user.name.clone(),
            entry.user.college.clone(),
            entry.upload_count.to_string(),
            entry.five_stars.to_string(),
            entry.points.to_string(),
        ]));
        csv_content.push('\n');
    }

    csv_content
}

pub fn resources_to_csv(resources: &[ResourceStats]) -> String {
    let mut csv_content =
        String::from("id,title,subject,semester,type,privacy,tags,average_rating,ratings,created_at\n");

    for stats in resources {
        let r = &stats.resource;
        csv_content.push_str(&csv_row(&[
            r.id.clone(),
            r.title.clone(),
            r.subject.clone(),
            r.semester.clone(),
            r.resource_type.to_string(),
            r.privacy.to_string(),
            r.tags.join(" "),
            format!("{:.2}", stats.average_rating),
            stats.rating_count.to_string(),
            r.created_at.to_rfc3339(),
        ]));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert the leaderboard to XLSX format
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn leaderboard_to_xlsx(entries: &[LeaderboardEntry]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Leaderboard")?;

    let headers = ["Rank", "Name", "College", "Uploads", "5-star reviews", "Points"];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (idx, entry) in entries.iter().enumerate() {
        let row = (idx + 1) as u32;
        worksheet.write_number(row, 0, (idx + 1) as f64)?;
        worksheet.write_string(row, 1, entry.user.name.as_str())?;
        worksheet.write_string(row, 2, entry.user.college.as_str())?;
        worksheet.write_number(row, 3, entry.upload_count as f64)?;
        worksheet.write_number(row, 4, f64::from(entry.five_stars))?;
        worksheet.write_number(row, 5, f64::from(entry.points))?;
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::fixtures::{resource, user};
    use crate::stats::leaderboard;

    #[test]
    fn pdf_meta_is_derived_from_id_and_title() {
        let mut r = resource("r1", "u1", "DBMS", ResourceType::Notes, 1);
        r.title = "DBMS".to_string();
        // 320 + (2 + 4) * 7
        assert_eq!(mock_pdf_meta(&r).file_size, "362 KB");
        assert_eq!(mock_pdf_meta(&r).file_type, "PDF");
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("OS: Unit 1/2   \"Notes\"?"), "OS Unit 12 Notes");
        assert_eq!(sanitize_file_name("  ***  "), "resource");
        assert_eq!(sanitize_file_name(&"x".repeat(200)).len(), 80);

        let r = resource("r1", "u1", "DBMS", ResourceType::Notes, 1);
        assert_eq!(download_file_name(&r), "DBMS Notes.pdf");
    }

    #[test]
    fn rendered_pdf_is_well_formed() {
        let mut r = resource("r1", "u1", "DBMS", ResourceType::Notes, 1);
        r.title = "Joins (inner) \\ outer".to_string();
        let bytes = render_resource_pdf(&r);
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("(Joins \\(inner\\) \\\\ outer) Tj"));

        // startxref must point at the xref table
        let start: usize = text
            .lines()
            .skip_while(|l| *l != "startxref")
            .nth(1)
            .unwrap()
            .parse()
            .unwrap();
        assert!(text[start..].starts_with("xref"));
    }

    #[test]
    fn leaderboard_csv_escapes_fields() {
        let mut u = user("u1", "IIT Delhi, Main Campus", 15);
        u.name = "Ravi \"RK\" Kumar".to_string();
        let board = leaderboard(&[u], &[], &[]);
        let csv = leaderboard_to_csv(&board);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "rank,name,college,uploads,five_star_reviews,points");
        assert_eq!(
            lines[1],
            "1,\"Ravi \"\"RK\"\" Kumar\",\"IIT Delhi, Main Campus\",0,0,15"
        );
    }

    #[test]
    fn resources_csv_has_one_row_per_resource() {
        let stats = crate::stats::resources_with_stats(
            &[
                resource("r1", "u1", "DBMS", ResourceType::Notes, 1),
                resource("r2", "u1", "OS", ResourceType::Pyq, 2),
            ],
            &[],
        );
        let csv = resources_to_csv(&stats);
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.lines().nth(2).unwrap().starts_with("r2,OS PYQ,OS,4,PYQ,Public,exam,0.00,0,"));
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_export_produces_a_zip_container() {
        let board = leaderboard(&[user("u1", "IIT Delhi", 5)], &[], &[]);
        let bytes = leaderboard_to_xlsx(&board).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
