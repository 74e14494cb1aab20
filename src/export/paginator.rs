use std::collections::VecDeque;

use serde_json::Value;

use crate::{
    export::{
        ExportError,
        pacing::{Pacing, Sleeper},
    },
    spotify::ApiError,
};

/// Lazy walk over an offset-paginated Spotify collection.
///
/// `fetch` is called with `(limit, offset)` and returns the raw page. Items
/// are read from `page[key]` (missing or null counts as empty) and the walk
/// continues while `page.next` is set, advancing the offset by exactly one
/// page size each time.
///
/// Rate-limited pages are retried at the same offset after a backoff; any
/// other failure is yielded once and ends the sequence. A paginator always
/// starts at offset 0 and cannot be restarted.
pub struct Paginator<'a, F> {
    fetch: F,
    key: &'a str,
    pacing: &'a Pacing,
    sleeper: &'a dyn Sleeper,
    offset: u32,
    fetched_pages: u32,
    exhausted: bool,
    buffer: VecDeque<Value>,
}

impl<'a, F> Paginator<'a, F>
where
    F: FnMut(u32, u32) -> Result<Value, ApiError>,
{
    /// Creates a paginator positioned before the first page. Nothing is
    /// fetched until the first call to `next`.
    ///
    /// # Arguments
    ///
    /// * `fetch` - Fetches one raw page for `(limit, offset)`
    /// * `key` - Name of the item array in each page, `"items"` for Spotify
    /// * `pacing` - Page size, page delay, backoff and retry cap
    /// * `sleeper` - Performs the page delays and rate-limit backoffs
    pub fn new(fetch: F, key: &'a str, pacing: &'a Pacing, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            fetch,
            key,
            pacing,
            sleeper,
            offset: 0,
            fetched_pages: 0,
            exhausted: false,
            buffer: VecDeque::new(),
        }
    }

    /// Fetches the page at the current offset into the buffer and moves the
    /// offset forward, or marks the walk exhausted when `next` is falsy.
    ///
    /// Every page after the first is preceded by the page delay. A 429 sleeps
    /// for the backoff and requests the same offset again.
    ///
    /// # Errors
    ///
    /// * `ExportError::RateLimitExhausted` - More consecutive 429s on this
    ///   page than the retry cap allows
    /// * `ExportError::Remote` - Any other fetch failure, returned unretried
    fn fetch_page(&mut self) -> Result<(), ExportError> {
        if self.fetched_pages > 0 {
            self.sleeper.sleep(self.pacing.page_delay);
        }

        let mut rate_limited = 0;
        let mut page = loop {
            match (self.fetch)(self.pacing.page_size, self.offset) {
                Ok(page) => break page,
                Err(ApiError::RateLimited { retry_after }) => {
                    rate_limited += 1;
                    if let Some(max) = self.pacing.max_rate_limit_retries {
                        if rate_limited > max {
                            return Err(ExportError::RateLimitExhausted {
                                offset: self.offset,
                                attempts: rate_limited,
                            });
                        }
                    }
                    self.sleeper.sleep(self.pacing.backoff(retry_after));
                }
                Err(e) => return Err(e.into()),
            }
        };
        self.fetched_pages += 1;

        if let Some(Value::Array(items)) = page.get_mut(self.key).map(Value::take) {
            self.buffer.extend(items);
        }

        if has_next(&page) {
            self.offset += self.pacing.page_size;
        } else {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl<F> Iterator for Paginator<'_, F>
where
    F: FnMut(u32, u32) -> Result<Value, ApiError>,
{
    type Item = Result<Value, ExportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}

/// A page continues when its `next` field is truthy: a missing field, `null`,
/// `false`, `0`, `""`, `[]` and `{}` all end the listing.
fn has_next(page: &Value) -> bool {
    match page.get("next") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(more)) => *more,
        Some(Value::String(next)) => !next.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(fields)) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    fn page(items: &[i64], more: bool) -> Value {
        json!({
            "items": items,
            "next": if more { json!("https://api.spotify.com/v1/next") } else { Value::Null },
        })
    }

    fn values(items: Vec<Result<Value, ExportError>>) -> Vec<i64> {
        items
            .into_iter()
            .map(|item| item.unwrap().as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_single_page_fetches_once() {
        let pacing = Pacing::default();
        let sleeper = RecordingSleeper::default();
        let mut calls = Vec::new();

        let items: Vec<_> = Paginator::new(
            |limit, offset| {
                calls.push((limit, offset));
                Ok(page(&[1, 2, 3], false))
            },
            "items",
            &pacing,
            &sleeper,
        )
        .collect();

        assert_eq!(values(items), vec![1, 2, 3]);
        assert_eq!(calls, vec![(50, 0)]);
        assert!(sleeper.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_multiple_pages_advance_by_page_size() {
        let pacing = Pacing {
            page_size: 2,
            ..Pacing::default()
        };
        let sleeper = RecordingSleeper::default();
        let mut calls = Vec::new();

        let items: Vec<_> = Paginator::new(
            |limit, offset| {
                calls.push((limit, offset));
                let first = offset as i64;
                Ok(page(&[first, first + 1], offset < 4))
            },
            "items",
            &pacing,
            &sleeper,
        )
        .collect();

        assert_eq!(values(items), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(calls, vec![(2, 0), (2, 2), (2, 4)]);
        assert_eq!(
            *sleeper.sleeps.borrow(),
            vec![pacing.page_delay, pacing.page_delay]
        );
    }

    #[test]
    fn test_missing_or_null_key_is_empty() {
        let pacing = Pacing::default();
        let sleeper = RecordingSleeper::default();
        let mut pages = vec![
            json!({"items": null, "next": "more"}),
            json!({"next": "more"}),
            json!({"items": [7], "next": null}),
        ]
        .into_iter();

        let items: Vec<_> =
            Paginator::new(|_, _| Ok(pages.next().unwrap()), "items", &pacing, &sleeper)
                .collect();

        assert_eq!(values(items), vec![7]);
    }

    #[test]
    fn test_reads_named_key() {
        let pacing = Pacing::default();
        let sleeper = RecordingSleeper::default();

        let items: Vec<_> = Paginator::new(
            |_, _| Ok(json!({"items": [1], "playlists": [9, 8], "next": null})),
            "playlists",
            &pacing,
            &sleeper,
        )
        .collect();

        assert_eq!(values(items), vec![9, 8]);
    }

    #[test]
    fn test_rate_limit_retries_same_offset() {
        let pacing = Pacing::default();
        let sleeper = RecordingSleeper::default();
        let mut calls = Vec::new();
        let mut limited_once = false;

        let items: Vec<_> = Paginator::new(
            |_, offset| {
                calls.push(offset);
                if offset == 50 && !limited_once {
                    limited_once = true;
                    return Err(ApiError::RateLimited {
                        retry_after: Some(2.0),
                    });
                }
                Ok(page(&[offset as i64], offset == 0))
            },
            "items",
            &pacing,
            &sleeper,
        )
        .collect();

        assert_eq!(values(items), vec![0, 50]);
        assert_eq!(calls, vec![0, 50, 50]);
        assert_eq!(
            *sleeper.sleeps.borrow(),
            vec![pacing.page_delay, Duration::from_secs(2)]
        );
    }

    #[test]
    fn test_rate_limit_backoff_is_at_least_one_second() {
        let pacing = Pacing::default();

        for (retry_after, expected) in [
            (Some(0.0), Duration::from_secs(1)),
            (Some(0.3), Duration::from_secs(1)),
            (None, Duration::from_secs(3)),
        ] {
            let sleeper = RecordingSleeper::default();
            let mut limited = false;
            let items: Vec<_> = Paginator::new(
                |_, _| {
                    if !limited {
                        limited = true;
                        return Err(ApiError::RateLimited { retry_after });
                    }
                    Ok(page(&[1], false))
                },
                "items",
                &pacing,
                &sleeper,
            )
            .collect();

            assert_eq!(values(items), vec![1]);
            assert_eq!(*sleeper.sleeps.borrow(), vec![expected]);
        }
    }

    #[test]
    fn test_other_errors_propagate_and_stop() {
        let pacing = Pacing::default();
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let mut paginator = Paginator::new(
            |_, offset| {
                calls += 1;
                if offset == 0 {
                    Ok(page(&[1], true))
                } else {
                    Err(ApiError::Status {
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        message: "boom".to_string(),
                    })
                }
            },
            "items",
            &pacing,
            &sleeper,
        );

        assert_eq!(paginator.next().unwrap().unwrap(), json!(1));
        assert!(matches!(
            paginator.next(),
            Some(Err(ExportError::Remote(ApiError::Status { .. })))
        ));
        assert!(paginator.next().is_none());
        drop(paginator);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_rate_limit_retries_are_capped() {
        let pacing = Pacing {
            max_rate_limit_retries: Some(2),
            ..Pacing::default()
        };
        let sleeper = RecordingSleeper::default();

        let items: Vec<_> = Paginator::new(
            |_, _| Err(ApiError::RateLimited { retry_after: None }),
            "items",
            &pacing,
            &sleeper,
        )
        .collect();

        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            Err(ExportError::RateLimitExhausted {
                offset: 0,
                attempts: 3
            })
        ));
        assert_eq!(sleeper.sleeps.borrow().len(), 2);
    }

    #[test]
    fn test_has_next() {
        assert!(has_next(&json!({"next": "https://next"})));
        assert!(!has_next(&json!({"next": null})));
        assert!(!has_next(&json!({"next": ""})));
        assert!(!has_next(&json!({})));
    }

    #[test]
    fn test_has_next_falsy_values_end_listing() {
        for next in [json!(false), json!(0), json!(0.0), json!([]), json!({})] {
            assert!(!has_next(&json!({ "next": next })), "next = {next}");
        }
        for next in [json!(true), json!(1), json!(["x"]), json!({"href": "https://next"})] {
            assert!(has_next(&json!({ "next": next })), "next = {next}");
        }
    }
}
