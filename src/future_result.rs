use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use crate::SortError;

/// `FutureResult` is a handle that makes it possible to wait for the
/// completion of an ongoing sort request.
///
/// Contrary to some `Future`, it does not need to be polled for the request to
/// progress.
///
/// - In a sync context, you can call `FutureResult::wait()`. The function
///   does not rely on `block_on`.
/// - In an async context, you can simply use `FutureResult` as a future.
///
/// Dropping the handle abandons the request: partial partition results that
/// were already collected are discarded, and no partial merged window is ever
/// observable through a dropped handle.
pub struct FutureResult<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    FailedBeforeStart(Option<SortError>),
    InProgress {
        receiver: oneshot::Receiver<crate::Result<T>>,
        error_msg_if_failure: &'static str,
    },
}

impl<T> From<SortError> for FutureResult<T> {
    fn from(err: SortError) -> Self {
        FutureResult {
            inner: Inner::FailedBeforeStart(Some(err)),
        }
    }
}

impl<T> FutureResult<T> {
    pub(crate) fn create(
        error_msg_if_failure: &'static str,
    ) -> (Self, oneshot::Sender<crate::Result<T>>) {
        let (sender, receiver) = oneshot::channel();
        let inner: Inner<T> = Inner::InProgress {
            receiver,
            error_msg_if_failure,
        };
        (FutureResult { inner }, sender)
    }

    /// Blocks until the result is available.
    ///
    /// In an async context, you should simply use `FutureResult` as a future.
    pub fn wait(self) -> crate::Result<T> {
        match self.inner {
            Inner::FailedBeforeStart(err) => Err(err.unwrap()),
            Inner::InProgress {
                receiver,
                error_msg_if_failure,
            } => receiver
                .recv()
                .unwrap_or_else(|_| Err(SortError::SystemError(error_msg_if_failure.to_string()))),
        }
    }
}

impl<T> Future for FutureResult<T> {
    type Output = crate::Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        unsafe {
            match &mut Pin::get_unchecked_mut(self).inner {
                Inner::FailedBeforeStart(err) => Poll::Ready(Err(err.take().unwrap())),
                Inner::InProgress {
                    receiver,
                    error_msg_if_failure,
                } => match Future::poll(Pin::new_unchecked(receiver), cx) {
                    Poll::Ready(oneshot_res) => {
                        let res = oneshot_res.unwrap_or_else(|_| {
                            Err(SortError::SystemError(error_msg_if_failure.to_string()))
                        });
                        Poll::Ready(res)
                    }
                    Poll::Pending => Poll::Pending,
                },
            }
        }
    }
}
