mod helpers;
mod leaderboard_test;
mod picks_test;
mod settlement_test;
