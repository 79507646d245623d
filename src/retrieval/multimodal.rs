//! Grouped multimodal answers and their UI rendering.

use crate::ingestion::mime_for_extension;
use crate::vector_store::{ContentType, SearchResult, UnitPayload};
use serde::Serialize;
use std::path::Path;

const NO_RESULTS: &str = "No results found";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageHit {
    pub description: String,
    pub image_b64: String,
    pub image_path: String,
    pub source: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableHit {
    pub description: String,
    pub table_csv: String,
    pub table_path: String,
    pub source: String,
    pub page: u32,
}

/// Search hits split by modality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedResults {
    /// Text hits joined by blank lines.
    pub text: String,
    pub images: Vec<ImageHit>,
    pub tables: Vec<TableHit>,
}

/// One renderable piece of an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponsePart {
    Text { content: String },
    Image { src: String, alt: String, caption: String },
    Table { content: String, caption: String },
}

impl GroupedResults {
    pub fn from_results(results: &[SearchResult]) -> Self {
        if results.is_empty() {
            return Self {
                text: NO_RESULTS.to_string(),
                images: Vec::new(),
                tables: Vec::new(),
            };
        }

        let mut texts = Vec::new();
        let mut images = Vec::new();
        let mut tables = Vec::new();

        for result in results {
            let unit = &result.unit;
            match (unit.content_type, &unit.payload) {
                (ContentType::Text, _) => texts.push(unit.content.clone()),
                (ContentType::Image, payload) => {
                    let (image_b64, image_path) = match payload {
                        UnitPayload::Image {
                            image_b64,
                            image_path,
                        } => (image_b64.clone(), image_path.clone()),
                        _ => (String::new(), String::new()),
                    };
                    images.push(ImageHit {
                        description: unit.content.clone(),
                        image_b64,
                        image_path,
                        source: unit.source_document.clone(),
                        page: unit.page,
                    });
                }
                (ContentType::Table, payload) => {
                    let (table_csv, table_path) = match payload {
                        UnitPayload::Table {
                            table_csv,
                            table_path,
                            ..
                        } => (table_csv.clone(), table_path.clone()),
                        _ => (String::new(), String::new()),
                    };
                    tables.push(TableHit {
                        description: unit.content.lines().next().unwrap_or_default().to_string(),
                        table_csv,
                        table_path,
                        source: unit.source_document.clone(),
                        page: unit.page,
                    });
                }
            }
        }

        Self {
            text: texts.join("\n\n"),
            images,
            tables,
        }
    }

    /// Flatten into parts: the text block first, then images, then tables.
    pub fn render_parts(&self) -> Vec<ResponsePart> {
        let mut parts = Vec::new();

        if !self.text.is_empty() {
            parts.push(ResponsePart::Text {
                content: self.text.clone(),
            });
        }

        for image in &self.images {
            let extension = Path::new(&image.image_path)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("png");
            parts.push(ResponsePart::Image {
                src: format!("data:{};base64,{}", mime_for_extension(extension), image.image_b64),
                alt: image.description.clone(),
                caption: caption(image.page, &image.source),
            });
        }

        for table in &self.tables {
            parts.push(ResponsePart::Table {
                content: table.table_csv.clone(),
                caption: caption(table.page, &table.source),
            });
        }

        parts
    }
}

fn caption(page: u32, source: &str) -> String {
    format!("Page {} of {}", page, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::ExtractedUnit;
    use serde_json::json;

    fn hit(content: &str, content_type: ContentType, payload: UnitPayload) -> SearchResult {
        SearchResult {
            unit: ExtractedUnit::new(
                content.to_string(),
                content_type,
                "report.pdf".to_string(),
                3,
                vec![1.0],
                payload,
            ),
            score: 0.9,
        }
    }

    fn sample() -> Vec<SearchResult> {
        vec![
            hit("First page.", ContentType::Text, UnitPayload::None),
            hit(
                "A pie chart",
                ContentType::Image,
                UnitPayload::Image {
                    image_b64: "AAA=".to_string(),
                    image_path: "pdf_images/report_page3_img1.jpg".to_string(),
                },
            ),
            hit("Second page.", ContentType::Text, UnitPayload::None),
            hit(
                "Table with 1 rows and 2 columns. Columns: a, b\na,b\n1,2\n",
                ContentType::Table,
                UnitPayload::Table {
                    table_json: json!([{"a": "1", "b": "2"}]),
                    table_csv: "a,b\n1,2\n".to_string(),
                    table_path: "pdf_tables/report_page3_table1.csv".to_string(),
                    rows: 1,
                    columns: 2,
                },
            ),
        ]
    }

    #[test]
    fn test_grouping() {
        let grouped = GroupedResults::from_results(&sample());
        assert_eq!(grouped.text, "First page.\n\nSecond page.");
        assert_eq!(grouped.images.len(), 1);
        assert_eq!(grouped.images[0].page, 3);
        assert_eq!(grouped.tables[0].description, "Table with 1 rows and 2 columns. Columns: a, b");
    }

    #[test]
    fn test_no_results() {
        let grouped = GroupedResults::from_results(&[]);
        assert_eq!(grouped.text, "No results found");
        assert!(grouped.images.is_empty());
    }

    #[test]
    fn test_render_parts() {
        let parts = GroupedResults::from_results(&sample()).render_parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[1],
            ResponsePart::Image {
                src: "data:image/jpeg;base64,AAA=".to_string(),
                alt: "A pie chart".to_string(),
                caption: "Page 3 of report.pdf".to_string(),
            }
        );

        let json = serde_json::to_value(&parts[2]).unwrap();
        assert_eq!(json["type"], "table");
        assert_eq!(json["content"], "a,b\n1,2\n");
    }
}
