use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Doppler Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::lobby::create_lobby,
        crate::routes::lobby::get_lobby,
        crate::routes::lobby::start_game,
        crate::routes::lobby::advance_round,
        crate::routes::lobby::final_results,
        crate::routes::play::join_lobby,
        crate::routes::play::update_skin,
        crate::routes::play::list_players,
        crate::routes::play::submit_answer,
        crate::routes::play::round_view,
        crate::routes::play::leaderboard,
        crate::routes::sse::lobby_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::lobby::CreateLobbyRequest,
            crate::dto::lobby::LobbyCreated,
            crate::dto::lobby::LobbyView,
            crate::dto::lobby::ViewerRole,
            crate::dto::play::JoinRequest,
            crate::dto::play::SkinRequest,
            crate::dto::play::PlayerView,
            crate::dto::play::RosterResponse,
            crate::dto::quiz::AnswerRequest,
            crate::dto::quiz::RoundView,
            crate::dto::quiz::LeaderboardEntry,
            crate::dto::quiz::LeaderboardResponse,
            crate::dto::quiz::FinalStanding,
            crate::dto::quiz::AggregateStats,
            crate::dto::quiz::FinalResults,
            crate::dto::sse::LobbyFrame,
            crate::dao::models::LobbyStatus,
            crate::dao::models::GameMode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobby", description = "Lobby lifecycle operations"),
        (name = "play", description = "Player-facing gameplay operations"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
