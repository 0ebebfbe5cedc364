use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use futures::future::try_join_all;
use serde::Deserialize;

use crate::api::auth::CurrentUser;
use crate::api::AppState;
use crate::engine::{quarter_containing, rank_bankrolls, LeaderboardCandidate, RankedBankroll};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// Top public bankrolls for the current calendar quarter.
///
/// `limit` can only shrink the configured leaderboard size.
pub async fn get_top_bankrolls(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<Vec<RankedBankroll>>, AppError> {
    let size = state.config.leaderboard_size;
    let limit = params.limit.map_or(size, |l| l.min(size));
    if limit == 0 {
        return Ok(Json(Vec::new()));
    }

    let window = quarter_containing(Utc::now());
    let from_ms = window.start.timestamp_millis();
    let to_ms = window.end.timestamp_millis();

    let public = state.repo.list_public_bankrolls_with_owner().await?;
    if public.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let candidate_futures = public.into_iter().map(|(bankroll, owner)| {
        let repo = state.repo.clone();
        async move {
            let bets = repo
                .list_bets_for_bankroll_between(bankroll.id, from_ms, to_ms)
                .await?;
            Ok::<_, AppError>(LeaderboardCandidate {
                bankroll,
                owner,
                bets,
            })
        }
    });

    let candidates = try_join_all(candidate_futures).await?;
    let ranked = rank_bankrolls(candidates, window, limit);

    tracing::debug!(
        entries = ranked.len(),
        quarter_start = %window.start,
        "Leaderboard computed"
    );

    Ok(Json(ranked))
}
