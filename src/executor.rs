//! Dispatches per-partition sort tasks, single threaded or on a thread pool.

use crate::{Result, SortError};

/// Search executor: partition tasks run on the caller thread or on a pool.
///
/// We don't expose the rayon thread pool directly here. First, dependency
/// hell: it is not a good idea to expose the API of a dependency, knowing it
/// might conflict with a different version used by the client. Second, we may
/// stop using rayon in the future.
pub enum Executor {
    /// Run all tasks in the caller thread.
    SingleThread,
    /// Dispatch tasks to a thread pool.
    ThreadPool(rayon::ThreadPool),
}

impl Executor {
    /// Creates an executor that performs all tasks in the caller thread.
    pub fn single_thread() -> Executor {
        Executor::SingleThread
    }

    /// Creates an executor that dispatches tasks to a thread pool.
    pub fn multi_thread(num_threads: usize, prefix: &'static str) -> Result<Executor> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |num| format!("{prefix}{num}"))
            .build()?;
        Ok(Executor::ThreadPool(pool))
    }

    /// Performs a map over the arguments, preserving argument order.
    ///
    /// Regardless of the executor variant, panics in a task will propagate to
    /// the caller.
    pub fn map<A, R, F>(&self, f: F, args: impl Iterator<Item = A>) -> Result<Vec<R>>
    where
        A: Send,
        R: Send,
        F: Sync + Fn(A) -> Result<R>,
    {
        match self {
            Executor::SingleThread => args.map(f).collect::<Result<_>>(),
            Executor::ThreadPool(pool) => {
                let args: Vec<A> = args.collect();
                let num_fruits = args.len();
                let fruit_receiver = {
                    let (fruit_sender, fruit_receiver) = crossbeam_channel::unbounded();
                    pool.scope(|scope| {
                        for (idx, arg) in args.into_iter().enumerate() {
                            let fruit_sender_clone = fruit_sender.clone();
                            let f = &f;
                            scope.spawn(move |_| {
                                let fruit = f(arg);
                                if let Err(err) = fruit_sender_clone.send((idx, fruit)) {
                                    error!(
                                        "Failed to send sort task fruit. It probably means all \
                                         sort threads have panicked. {err:?}"
                                    );
                                }
                            });
                        }
                    });
                    fruit_receiver
                    // This ends the scope of fruit_sender.
                    // This is important as it makes it possible for the
                    // fruit_receiver iteration to terminate.
                };
                let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None)
                    .take(num_fruits)
                    .collect();
                for (idx, fruit_res) in fruit_receiver {
                    results[idx] = Some(fruit_res?);
                }
                results
                    .into_iter()
                    .map(|fruit_opt| {
                        fruit_opt.ok_or_else(|| {
                            SortError::SystemError(
                                "A partition sort task did not deliver its result".to_string(),
                            )
                        })
                    })
                    .collect()
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Executor {
        Executor::single_thread()
    }
}

#[cfg(test)]
mod tests {
    use super::Executor;

    #[test]
    #[should_panic(expected = "panic should propagate")]
    fn test_panic_propagates_single_thread() {
        let _result: Vec<usize> = Executor::single_thread()
            .map(
                |_| {
                    panic!("panic should propagate");
                },
                vec![0].into_iter(),
            )
            .unwrap();
    }

    #[test]
    #[should_panic]
    fn test_panic_propagates_multi_thread() {
        let _result: Vec<usize> = Executor::multi_thread(1, "sort-test-")
            .unwrap()
            .map(
                |_| {
                    panic!("panic should propagate");
                },
                vec![0].into_iter(),
            )
            .unwrap();
    }

    #[test]
    fn test_map_single_thread() {
        let result: Vec<usize> = Executor::single_thread()
            .map(|i| Ok(i * 2), 0..1_000)
            .unwrap();
        assert_eq!(result.len(), 1_000);
        for (i, r) in result.into_iter().enumerate() {
            assert_eq!(r, i * 2);
        }
    }

    #[test]
    fn test_map_multi_thread_preserves_order() {
        let result: Vec<usize> = Executor::multi_thread(3, "sort-test-")
            .unwrap()
            .map(|i| Ok(i * 2), 0..10)
            .unwrap();
        assert_eq!(result, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }
}
