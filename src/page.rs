use std::future::Future;

/// One page of a paginated listing. `next` is `None` on the last page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, C = String> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Fetches pages until the last one and concatenates their items. The first failing
/// page aborts the drain.
pub async fn drain<T, C, F, Fut>(mut fetch: F) -> anyhow::Result<Vec<T>>
where
    F: FnMut(Option<C>) -> Fut,
    Fut: Future<Output = anyhow::Result<Page<T, C>>>,
{
    let mut items = vec![];
    let mut cursor = None;

    loop {
        let page = fetch(cursor.take()).await?;

        items.extend(page.items);

        match page.next {
            None => return Ok(items),
            Some(next) => cursor = Some(next),
        }
    }
}
