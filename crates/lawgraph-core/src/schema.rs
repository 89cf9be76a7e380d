/// Arrow layout of the article chunk table.
///
/// Scalar fields are plain `Utf8` columns. Nested structure (paragraphs,
/// reference lists, abbreviation maps) is stored as JSON text so the table
/// stays flat and readable by any Parquet consumer.
pub mod chunks {
    use std::sync::Arc;

    use arrow::array::{Array, ArrayRef, LargeStringArray, StringArray};
    use arrow::record_batch::RecordBatch;
    use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
    use serde::de::DeserializeOwned;

    use crate::error::CoreError;
    use crate::model::{ArticleChunk, LawCategory};

    /// Schema for one row per article.
    pub fn chunk_table_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("chunk_key", DataType::Utf8, false),
            Field::new("law_id", DataType::Utf8, false),
            Field::new("law_name", DataType::Utf8, false),
            Field::new("law_category", DataType::Utf8, false),
            Field::new("article_num", DataType::Utf8, false),
            Field::new("article_sub", DataType::Utf8, true),
            Field::new("article_title", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("content_resolved", DataType::Utf8, false),
            Field::new("paragraphs_json", DataType::Utf8, false),
            Field::new("internal_refs_json", DataType::Utf8, false),
            Field::new("external_refs_json", DataType::Utf8, false),
            Field::new("parent_refs_json", DataType::Utf8, false),
            Field::new("abbreviations_json", DataType::Utf8, false),
            Field::new("effective_date", DataType::Utf8, true),
            Field::new("change_type", DataType::Utf8, true),
        ]))
    }

    /// Encode chunks as a single batch in [`chunk_table_schema`] layout.
    pub fn chunks_to_batch(chunks: &[ArticleChunk]) -> Result<RecordBatch, CoreError> {
        let text = |f: fn(&ArticleChunk) -> &str| -> ArrayRef {
            Arc::new(StringArray::from_iter_values(chunks.iter().map(f)))
        };
        let json = |f: fn(&ArticleChunk) -> serde_json::Result<String>| -> Result<ArrayRef, CoreError> {
            let values = chunks.iter().map(f).collect::<Result<Vec<_>, _>>()?;
            Ok(Arc::new(StringArray::from(values)))
        };
        let optional = |f: fn(&ArticleChunk) -> Option<&str>| -> ArrayRef {
            Arc::new(chunks.iter().map(f).collect::<StringArray>())
        };

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                chunks.iter().map(ArticleChunk::chunk_key),
            )),
            text(|c| c.law_id.as_str()),
            text(|c| c.law_name.as_str()),
            text(|c| c.law_category.as_str()),
            text(|c| c.article_num.as_str()),
            optional(|c| c.article_sub.as_deref()),
            text(|c| c.article_title.as_str()),
            text(|c| c.content.as_str()),
            text(|c| c.content_resolved.as_str()),
            json(|c| serde_json::to_string(&c.paragraphs))?,
            json(|c| serde_json::to_string(&c.internal_refs))?,
            json(|c| serde_json::to_string(&c.external_refs))?,
            json(|c| serde_json::to_string(&c.parent_refs))?,
            json(|c| serde_json::to_string(&c.abbreviations))?,
            optional(|c| Some(c.effective_date.as_str()).filter(|s| !s.is_empty())),
            optional(|c| Some(c.change_type.as_str()).filter(|s| !s.is_empty())),
        ];

        Ok(RecordBatch::try_new(chunk_table_schema(), columns)?)
    }

    /// Decode a batch in [`chunk_table_schema`] layout.
    ///
    /// Columns are looked up by name; `LargeUtf8` is accepted wherever
    /// `Utf8` is expected.
    pub fn batch_to_chunks(batch: &RecordBatch) -> Result<Vec<ArticleChunk>, CoreError> {
        let col = |name: &'static str| {
            batch
                .column_by_name(name)
                .ok_or(CoreError::MissingField(name))
        };
        let law_id = col("law_id")?;
        let law_name = col("law_name")?;
        let law_category = col("law_category")?;
        let article_num = col("article_num")?;
        let article_sub = col("article_sub")?;
        let article_title = col("article_title")?;
        let content = col("content")?;
        let content_resolved = col("content_resolved")?;
        let paragraphs = col("paragraphs_json")?;
        let internal = col("internal_refs_json")?;
        let external = col("external_refs_json")?;
        let parent = col("parent_refs_json")?;
        let abbreviations = col("abbreviations_json")?;
        let effective_date = col("effective_date")?;
        let change_type = col("change_type")?;

        let mut out = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let name = get_string(law_name.as_ref(), row).unwrap_or_default();
            let category = get_string(law_category.as_ref(), row)
                .and_then(|s| LawCategory::parse(&s))
                .unwrap_or_else(|| LawCategory::from_law_name(&name));
            out.push(ArticleChunk {
                law_id: get_string(law_id.as_ref(), row).unwrap_or_default(),
                law_name: name,
                law_category: category,
                article_num: get_string(article_num.as_ref(), row).unwrap_or_default(),
                article_sub: get_string(article_sub.as_ref(), row).filter(|s| !s.is_empty()),
                article_title: get_string(article_title.as_ref(), row).unwrap_or_default(),
                content: get_string(content.as_ref(), row).unwrap_or_default(),
                content_resolved: get_string(content_resolved.as_ref(), row).unwrap_or_default(),
                paragraphs: get_json(paragraphs.as_ref(), row)?,
                internal_refs: get_json(internal.as_ref(), row)?,
                external_refs: get_json(external.as_ref(), row)?,
                parent_refs: get_json(parent.as_ref(), row)?,
                abbreviations: get_json(abbreviations.as_ref(), row)?,
                effective_date: get_string(effective_date.as_ref(), row).unwrap_or_default(),
                change_type: get_string(change_type.as_ref(), row).unwrap_or_default(),
            });
        }
        Ok(out)
    }

    fn get_json<T: DeserializeOwned + Default>(col: &dyn Array, row: usize) -> Result<T, CoreError> {
        match get_string(col, row) {
            Some(s) if !s.is_empty() => Ok(serde_json::from_str(&s)?),
            _ => Ok(T::default()),
        }
    }

    fn get_string(col: &dyn Array, row: usize) -> Option<String> {
        if col.is_null(row) {
            return None;
        }
        col.as_any()
            .downcast_ref::<StringArray>()
            .map(|arr| arr.value(row).to_string())
            .or_else(|| {
                col.as_any()
                    .downcast_ref::<LargeStringArray>()
                    .map(|arr| arr.value(row).to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::chunks::*;
    use crate::abbrev::AbbreviationMap;
    use crate::model::{ArticleChunk, Paragraph, RefTarget, Reference};

    fn sample() -> Vec<ArticleChunk> {
        let mut decree = ArticleChunk::new(
            "건축법 시행령",
            "2118",
            "31",
            "건축선",
            "법 제46조제1항에 따라 정한다.",
        );
        decree.parent_refs = vec![Reference {
            target: RefTarget::Parent {
                law_name: "건축법".into(),
            },
            article: "46".into(),
            paragraph: Some("1".into()),
            item: None,
            raw: "법 제46조제1항".into(),
        }];
        decree.paragraphs = vec![Paragraph {
            num: "1".into(),
            content: "① 건축선".into(),
            subs: vec![],
        }];
        decree.effective_date = "20240101".into();

        let mut act = ArticleChunk::new("건축법", "1823", "2", "정의", "위원회는 심의한다.");
        act.article_sub = Some("1".into());
        act.abbreviations =
            AbbreviationMap::sanitized("건축법", [("위원회", "건축위원회")]);
        act.content_resolved = "건축위원회는 심의한다.".into();
        vec![decree, act]
    }

    #[test]
    fn chunk_schema_has_expected_fields() {
        let schema = chunk_table_schema();
        assert_eq!(schema.fields().len(), 16);
        assert!(schema.field_with_name("chunk_key").is_ok());
        assert!(schema.field_with_name("article_sub").unwrap().is_nullable());
        assert!(!schema.field_with_name("content").unwrap().is_nullable());
    }

    #[test]
    fn batch_preserves_structure() {
        let chunks = sample();
        let batch = chunks_to_batch(&chunks).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 16);

        let back = batch_to_chunks(&batch).unwrap();
        assert_eq!(back, chunks);
    }

    #[test]
    fn missing_column_is_reported() {
        use arrow::array::StringArray;
        use arrow::record_batch::RecordBatch;
        use arrow::datatypes::{DataType, Field, Schema};
        use std::sync::Arc;

        let schema = Arc::new(Schema::new(vec![Field::new("law_id", DataType::Utf8, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(vec!["1823"]))]).unwrap();
        let err = batch_to_chunks(&batch).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::MissingField("law_name")));
    }
}
