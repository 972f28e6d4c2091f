//! Mapping helpers between stored rows and pipeline results.

use crate::{
    clustering::KMeansResult,
    processing::types::{ClusterAssignment, ClusterSummary, DocumentStatus, SimilarDocument},
    store::DocumentRecord,
};

/// Status view of a stored document.
pub(crate) fn to_status(record: &DocumentRecord) -> DocumentStatus {
    DocumentStatus {
        summary_status: record.summary_status,
        has_summary: record.has_summary(),
        detail: record.status_detail.clone(),
    }
}

/// Pair every clustered document with its cluster, and every cluster with its label terms.
///
/// `documents` and `result.labels` are index-aligned; `topics` is indexed by cluster.
pub(crate) fn map_clusters(
    documents: &[DocumentRecord],
    result: &KMeansResult,
    topics: &[Vec<String>],
) -> (Vec<ClusterSummary>, Vec<ClusterAssignment>) {
    let clusters = (0..result.cluster_count())
        .map(|cluster| ClusterSummary {
            cluster_id: cluster as i64,
            topics: topics.get(cluster).cloned().unwrap_or_default(),
            document_ids: result
                .members(cluster)
                .into_iter()
                .map(|index| documents[index].id)
                .collect(),
        })
        .collect();

    let assignments = documents
        .iter()
        .zip(&result.labels)
        .map(|(document, label)| ClusterAssignment {
            id: document.id,
            title: document.title.clone(),
            cluster_id: *label as i64,
        })
        .collect();

    (clusters, assignments)
}

/// Convert ranked `(record, score)` pairs into similarity hits.
pub(crate) fn map_similar(ranked: Vec<(DocumentRecord, f32)>) -> Vec<SimilarDocument> {
    ranked
        .into_iter()
        .map(|(record, score)| SimilarDocument {
            id: record.id,
            title: record.title,
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SummaryStatus;

    fn record(id: i64, title: &str) -> DocumentRecord {
        DocumentRecord {
            id,
            owner: None,
            title: title.into(),
            file_path: format!("uploads/{title}"),
            content_hash: "hash".into(),
            summary: Some("A summary.".into()),
            summary_status: SummaryStatus::Done,
            status_detail: None,
            keywords: Vec::new(),
            cluster_id: None,
            topics: Vec::new(),
            embedding: None,
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn clusters_group_document_ids() {
        let documents = vec![record(10, "a.pdf"), record(11, "b.pdf"), record(12, "c.pdf")];
        let result = KMeansResult {
            labels: vec![1, 0, 1],
            centroids: vec![vec![0.0], vec![1.0]],
            iterations: 2,
        };
        let topics = vec![vec!["tax".to_string()], vec!["football".to_string()]];

        let (clusters, assignments) = map_clusters(&documents, &result, &topics);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].document_ids, vec![11]);
        assert_eq!(clusters[1].document_ids, vec![10, 12]);
        assert_eq!(clusters[1].topics, vec!["football".to_string()]);
        assert_eq!(assignments[2].cluster_id, 1);
        assert_eq!(assignments[2].title, "c.pdf");
    }

    #[test]
    fn status_reports_summary_presence() {
        let mut stored = record(1, "a.pdf");
        assert!(to_status(&stored).has_summary);
        stored.summary = None;
        stored.summary_status = SummaryStatus::Error;
        stored.status_detail = Some("no text".into());
        let status = to_status(&stored);
        assert!(!status.has_summary);
        assert_eq!(status.detail.as_deref(), Some("no text"));
    }
}
