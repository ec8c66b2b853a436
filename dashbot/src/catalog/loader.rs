//! Paginated catalog loading.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{CatalogLoadError, RequestFailure};
use crate::models::{CatalogEntry, Session};

use super::Catalog;

/// Number of views requested per page.
pub const PAGE_SIZE: u32 = 1000;

/// One page of views plus the pagination metadata the server reported.
#[derive(Debug, Clone, Default)]
pub struct ViewPage {
    pub entries: Vec<CatalogEntry>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_available: u64,
}

impl ViewPage {
    /// Whether the server has views beyond this page.
    pub fn has_more(&self) -> bool {
        u64::from(self.page_number) * u64::from(self.page_size) < self.total_available
    }
}

/// Anything that can serve numbered pages of the view list.
#[async_trait]
pub trait ViewSource: Send + Sync {
    async fn fetch_page(
        &self,
        session: &Session,
        page_number: u32,
        page_size: u32,
    ) -> Result<ViewPage, RequestFailure>;
}

/// Fetch every page in order and assemble the full catalog.
///
/// Pages are requested strictly sequentially because the decision to fetch
/// the next one depends on the previous page's metadata. Any failed page, or
/// an empty page while more views are reported, aborts the whole pass.
pub async fn load_all<S>(source: &S, session: &Session) -> Result<Catalog, CatalogLoadError>
where
    S: ViewSource + ?Sized,
{
    let mut entries = Vec::new();
    let mut page_number = 1;

    loop {
        let page = source
            .fetch_page(session, page_number, PAGE_SIZE)
            .await
            .map_err(|cause| CatalogLoadError::Page {
                page: page_number,
                cause,
            })?;

        let has_more = page.has_more();
        let received = page.entries.len();
        debug!(
            page = page_number,
            received,
            total = page.total_available,
            has_more,
            "Fetched views page"
        );
        entries.extend(page.entries);

        if !has_more {
            break;
        }
        if received == 0 {
            warn!(
                page = page_number,
                received = entries.len(),
                total = page.total_available,
                "Empty views page while more were reported"
            );
            return Err(CatalogLoadError::Inconsistent {
                page: page_number,
                received: entries.len(),
                total: page.total_available,
            });
        }
        page_number += 1;
    }

    info!(views = entries.len(), pages = page_number, "Catalog loaded");
    Ok(Catalog::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serves `total` synthetic views, optionally failing on one page.
    struct FakeSource {
        total: u64,
        fail_on: Option<u32>,
        requested: Mutex<Vec<u32>>,
    }

    impl FakeSource {
        fn new(total: u64) -> Self {
            Self {
                total,
                fail_on: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(total: u64, page: u32) -> Self {
            Self {
                fail_on: Some(page),
                ..Self::new(total)
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ViewSource for FakeSource {
        async fn fetch_page(
            &self,
            _session: &Session,
            page_number: u32,
            page_size: u32,
        ) -> Result<ViewPage, RequestFailure> {
            self.requested.lock().unwrap().push(page_number);
            if self.fail_on == Some(page_number) {
                return Err(RequestFailure::Malformed("boom".to_string()));
            }

            let start = u64::from(page_number - 1) * u64::from(page_size);
            let end = (start + u64::from(page_size)).min(self.total);
            let entries = (start..end)
                .map(|i| {
                    CatalogEntry::from_view(
                        format!("v-{i}"),
                        format!("View {i}"),
                        &format!("Book/sheets/View{i}"),
                    )
                })
                .collect();

            Ok(ViewPage {
                entries,
                page_number,
                page_size,
                total_available: self.total,
            })
        }
    }

    fn session() -> Session {
        Session::new("token".to_string(), "site".to_string())
    }

    #[tokio::test]
    async fn test_single_page_catalog_is_returned_once() {
        let source = FakeSource::new(3);
        let catalog = load_all(&source, &session()).await.unwrap();

        assert_eq!(source.requested(), vec![1]);
        assert_eq!(catalog.len(), 3);
        let ids: Vec<_> = catalog.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["v-0", "v-1", "v-2"]);
    }

    #[tokio::test]
    async fn test_three_pages_fetched_in_order() {
        let source = FakeSource::new(2500);
        let catalog = load_all(&source, &session()).await.unwrap();

        assert_eq!(source.requested(), vec![1, 2, 3]);
        assert_eq!(catalog.len(), 2500);
        assert_eq!(catalog.entries()[0].id, "v-0");
        assert_eq!(catalog.entries()[1000].id, "v-1000");
        assert_eq!(catalog.entries()[2499].id, "v-2499");
    }

    #[tokio::test]
    async fn test_exact_page_multiple_does_not_overfetch() {
        let source = FakeSource::new(2000);
        let catalog = load_all(&source, &session()).await.unwrap();

        assert_eq!(source.requested(), vec![1, 2]);
        assert_eq!(catalog.len(), 2000);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let source = FakeSource::new(0);
        let catalog = load_all(&source, &session()).await.unwrap();

        assert_eq!(source.requested(), vec![1]);
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_failed_page_aborts_load() {
        let source = FakeSource::failing_on(2500, 2);
        let err = load_all(&source, &session()).await.unwrap_err();

        assert!(matches!(err, CatalogLoadError::Page { page: 2, .. }));
        assert_eq!(source.requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_empty_page_with_more_reported_fails() {
        /// Serves one full page, then empty pages, while claiming 2500 views.
        struct ShortSource;

        #[async_trait]
        impl ViewSource for ShortSource {
            async fn fetch_page(
                &self,
                _session: &Session,
                page_number: u32,
                page_size: u32,
            ) -> Result<ViewPage, RequestFailure> {
                let entries = if page_number == 1 {
                    (0..page_size)
                        .map(|i| {
                            CatalogEntry::from_view(
                                format!("v-{i}"),
                                format!("View {i}"),
                                &format!("Book/sheets/View{i}"),
                            )
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                Ok(ViewPage {
                    entries,
                    page_number,
                    page_size,
                    total_available: 2500,
                })
            }
        }

        let err = load_all(&ShortSource, &session()).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogLoadError::Inconsistent {
                page: 2,
                received: 1000,
                total: 2500
            }
        ));
    }

    #[test]
    fn has_more_uses_reported_metadata() {
        let page = |page_number, total_available| ViewPage {
            page_number,
            page_size: 1000,
            total_available,
            ..ViewPage::default()
        };
        assert!(page(1, 2500).has_more());
        assert!(page(2, 2500).has_more());
        assert!(!page(3, 2500).has_more());
        assert!(!page(1, 1000).has_more());
    }
}
