//! Sequencing and fork-join combinators.
//!
//! - `next` / `finish`: run a step only if the previous one succeeded
//! - `split_and_cancel_first`: fail-fast join of any number of branches
//! - `split`: join that always collects every branch result, stoppable by token
//! - `prepare_sauce_and_rosemary`: one critical branch, two non-critical ones
//!
//! Branches run as tokio tasks owned by a `JoinSet`. Dropping a join aborts
//! every branch it still owns; cancelling a branch drops its future at its
//! current suspension point.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::ProcessError;

/// Run `step` on the previous result, or pass its failure through untouched.
pub async fn next<T, U, F, Fut>(
    prior: Result<T, ProcessError>,
    step: F,
) -> Result<U, ProcessError>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<U, ProcessError>>,
{
    match prior {
        Ok(value) => step(value).await,
        Err(err) => Err(err),
    }
}

/// Terminal step: convert the final state into the artifact.
pub async fn finish<T, U, F, Fut>(
    prior: Result<T, ProcessError>,
    make: F,
) -> Result<U, ProcessError>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<U, ProcessError>>,
{
    next(prior, make).await
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn join_error(err: JoinError) -> ProcessError {
    if err.is_panic() {
        ProcessError::BranchPanicked(panic_message(err.into_panic()))
    } else {
        ProcessError::Cancelled
    }
}

/// Run every branch concurrently. The first failure aborts the rest and
/// becomes the result; otherwise all values are returned in input order.
///
/// Returns once every branch task has stopped.
pub async fn split_and_cancel_first<T>(
    branches: Vec<BoxFuture<'static, Result<T, ProcessError>>>,
) -> Result<Vec<T>, ProcessError>
where
    T: Send + 'static,
{
    let mut values: Vec<Option<T>> = branches.iter().map(|_| None).collect();
    let mut tasks = JoinSet::new();
    for (index, branch) in branches.into_iter().enumerate() {
        tasks.spawn(branch.map(move |result| result.map(|value| (index, value))));
    }

    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(join_error).and_then(|result| result) {
            Ok((index, value)) => values[index] = Some(value),
            Err(err) => {
                tracing::info!(error = %err, "Branch failed, cancelling its siblings");
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                return Err(err);
            }
        }
    }

    values
        .into_iter()
        .map(|value| value.ok_or(ProcessError::Cancelled))
        .collect()
}

/// Run every branch concurrently and collect all results in input order.
///
/// A branch failure never affects its siblings. Cancelling `token` stops the
/// branches still running; each of them reports `Cancelled`.
pub async fn split<T>(
    branches: Vec<BoxFuture<'static, Result<T, ProcessError>>>,
    token: CancellationToken,
) -> Vec<Result<T, ProcessError>>
where
    T: Send + 'static,
{
    let mut results: Vec<Option<Result<T, ProcessError>>> =
        branches.iter().map(|_| None).collect();
    let mut tasks = JoinSet::new();
    for (index, branch) in branches.into_iter().enumerate() {
        let token = token.clone();
        tasks.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(ProcessError::Cancelled),
                caught = AssertUnwindSafe(branch).catch_unwind() => match caught {
                    Ok(result) => result,
                    Err(payload) => Err(ProcessError::BranchPanicked(panic_message(payload))),
                },
            };
            (index, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(err) => tracing::warn!(error = %err, "Branch task ended abnormally"),
        }
    }

    results
        .into_iter()
        .map(|result| result.unwrap_or(Err(ProcessError::Cancelled)))
        .collect()
}

enum Pair<A, B> {
    First(A),
    Second(B),
}

/// Fail-fast join of the meat and grill branches, then `combine` on success.
pub async fn prepare_meat_and_grill<M, G, U, FM, FG, C, CF>(
    meat: FM,
    grill: FG,
    combine: C,
) -> Result<U, ProcessError>
where
    M: Send + 'static,
    G: Send + 'static,
    FM: Future<Output = Result<M, ProcessError>> + Send + 'static,
    FG: Future<Output = Result<G, ProcessError>> + Send + 'static,
    C: FnOnce(M, G) -> CF,
    CF: Future<Output = Result<U, ProcessError>>,
{
    let branches = vec![
        meat.map(|result| result.map(Pair::First)).boxed(),
        grill.map(|result| result.map(Pair::Second)).boxed(),
    ];
    let mut prepared = split_and_cancel_first(branches).await?.into_iter();
    match (prepared.next(), prepared.next()) {
        (Some(Pair::First(meat)), Some(Pair::Second(grill))) => combine(meat, grill).await,
        _ => Err(ProcessError::Cancelled),
    }
}

/// Critical/non-critical join.
///
/// `meat` is critical: if it fails, both garnish branches are cancelled and
/// awaited, `serve` is skipped, and the meat failure is returned. Otherwise
/// `serve` receives the meat result and the raw result of each garnish branch
/// once both have finished. Garnish failures never cancel anything.
///
/// Dropping the returned future aborts every branch still running.
pub async fn prepare_sauce_and_rosemary<M, S, U, FM, FS, FR, SV, SF>(
    meat: FM,
    sauce: FS,
    rosemary: FR,
    serve: SV,
) -> Result<U, ProcessError>
where
    M: Send + 'static,
    S: Send + 'static,
    FM: Future<Output = Result<M, ProcessError>> + Send + 'static,
    FS: Future<Output = Result<S, ProcessError>> + Send + 'static,
    FR: Future<Output = Result<S, ProcessError>> + Send + 'static,
    SV: FnOnce(M, Result<S, ProcessError>, Result<S, ProcessError>) -> SF,
    SF: Future<Output = Result<U, ProcessError>>,
{
    let token = CancellationToken::new();
    let mut critical = JoinSet::new();
    critical.spawn(meat);

    let roast = async {
        let result = match critical.join_next().await {
            Some(joined) => joined.map_err(join_error).and_then(|result| result),
            None => Err(ProcessError::Cancelled),
        };
        if let Err(err) = &result {
            tracing::info!(error = %err, "Critical branch failed, cancelling garnish branches");
            token.cancel();
        }
        result
    };
    let garnish = split(vec![sauce.boxed(), rosemary.boxed()], token.clone());

    let (meat, garnish) = tokio::join!(roast, garnish);
    let meat = meat?;

    let mut garnish = garnish.into_iter();
    let sauce = garnish.next().unwrap_or(Err(ProcessError::Cancelled));
    let rosemary = garnish.next().unwrap_or(Err(ProcessError::Cancelled));

    serve(meat, sauce, rosemary).await
}
