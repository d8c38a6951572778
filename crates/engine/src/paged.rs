use standings_core::{Collection, Row};
use standings_storage::Store;
use tracing::{debug, warn};

/// Rows per page request; equal to the store's hard per-request cap.
pub const PAGE_SIZE: usize = 1000;

/// Reads a whole collection through the store's capped range reads.
///
/// A short page is the only end-of-data signal, so the page size must not
/// exceed the store's cap: a capped page would look short and end the read
/// early.
pub struct PagedReader<'a, S: ?Sized> {
    store: &'a S,
    page_size: usize,
    on_progress: Option<&'a (dyn Fn(usize) + Send + Sync)>,
}

impl<'a, S: Store + ?Sized> PagedReader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            page_size: PAGE_SIZE,
            on_progress: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Called with the running row count after every non-empty page.
    pub fn on_progress(mut self, observer: &'a (dyn Fn(usize) + Send + Sync)) -> Self {
        self.on_progress = Some(observer);
        self
    }

    /// Every row of `collection`, ascending by `order_key`.
    ///
    /// A failed page request ends the read; the rows gathered so far are
    /// returned and the failure is only logged.
    pub async fn fetch_all(&self, collection: Collection, order_key: &str) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let page = match self
                .store
                .select_range(collection, order_key, offset, self.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        collection = %collection,
                        offset,
                        fetched = rows.len(),
                        error = %e,
                        "page request failed; returning partial result"
                    );
                    break;
                }
            };

            let page_len = page.len();
            rows.extend(page);
            if page_len > 0 {
                debug!(collection = %collection, offset, fetched = rows.len(), "page fetched");
                if let Some(observer) = self.on_progress {
                    observer(rows.len());
                }
            }
            if page_len < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use standings_storage::SqliteStorage;

    #[tokio::test]
    async fn zero_page_size_is_clamped() {
        let store = SqliteStorage::open_in_memory().unwrap();
        let rows = PagedReader::new(&store)
            .with_page_size(0)
            .fetch_all(Collection::Managers, "id")
            .await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn unknown_order_key_ends_the_read() {
        let store = SqliteStorage::open_in_memory().unwrap();
        let rows = PagedReader::new(&store)
            .fetch_all(Collection::Managers, "id; DROP TABLE managers")
            .await;
        assert!(rows.is_empty());
    }
}
