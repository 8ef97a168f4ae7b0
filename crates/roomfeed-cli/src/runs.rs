//! `pipeline_runs` ledger helpers shared by the collect and post commands.

pub(crate) const RUN_TYPE_COLLECT: &str = "collect";
pub(crate) const RUN_TYPE_POST: &str = "post";
const TRIGGER_SOURCE: &str = "cli";

/// Creates a run and moves it to `running`. Returns the run id.
pub(crate) async fn begin(pool: &sqlx::PgPool, run_type: &'static str) -> anyhow::Result<i64> {
    let run = roomfeed_db::create_pipeline_run(pool, run_type, TRIGGER_SOURCE).await?;
    if let Err(e) = roomfeed_db::start_pipeline_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, run_type, format!("{e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(run_id = run.id, public_id = %run.public_id, run_type, "pipeline run started");
    Ok(run.id)
}

/// Marks a run `succeeded`; a ledger failure here marks it `failed` and
/// propagates.
pub(crate) async fn finish(
    pool: &sqlx::PgPool,
    run_id: i64,
    run_type: &'static str,
    records: usize,
) -> anyhow::Result<()> {
    let records = i32::try_from(records).unwrap_or(i32::MAX);
    if let Err(err) = roomfeed_db::complete_pipeline_run(pool, run_id, records).await {
        fail_run_best_effort(pool, run_id, run_type, format!("{err:#}")).await;
        return Err(err.into());
    }
    Ok(())
}

/// Marks a run `failed`, logging rather than propagating any error from the
/// ledger itself.
pub(crate) async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = roomfeed_db::fail_pipeline_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}
