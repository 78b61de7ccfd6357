use std::{env, fs, path::PathBuf};

use backend::{AuthState, User};
use db::models::{
    chatbot::{Chatbot, CreateChatbot},
    document::{Document, DocumentKind, DocumentStatus},
    knowledge_base::{CreateKnowledgeBase, KnowledgeBase, RetrainSchedule},
};
use server::routes::{
    analytics::AnalyticsQuery,
    chatbots::{ChatbotSummary, EmbedCode},
    dashboard::DashboardResponse,
    integrations::{IntegrationsView, SetupIntegrationRequest},
    knowledge_bases::{
        KnowledgeBaseDetail,
        documents::{AddTextRequest, ScrapeUrlRequest},
    },
    session::LoginRequest,
    test_chat::{SendMessageRequest, TestChatView},
};
use services::services::{
    analytics::{
        AnalyticsData, AnalyticsReport, BotPerformance, BotPerformanceRow, DailyMessages,
        HourlyResponseTime, PerformanceTier, TimeRange, TopQuestion,
    },
    chatbots::ModelOption,
    dashboard::{DashboardOverview, RecentChatbot, RecentKnowledgeBase},
    integrations::{Integration, IntegrationKind, IntegrationStatus, IntegrationType},
    knowledge_base::UploadProgress,
    marketing::{Feature, Hero, IntegrationTeaser, MarketingPage, PricingPlan},
    session::GateView,
    test_chat::{ChatMessage, ChatRole, ChatState, IgnoreReason, SendOutcome},
};
use ts_rs::TS;
use utils::response::ApiResponse;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`. Do not edit it by hand.\n\n";
    let decls = [
        ApiResponse::<(), ()>::decl(),
        User::decl(),
        AuthState::decl(),
        GateView::decl(),
        LoginRequest::decl(),
        KnowledgeBase::decl(),
        CreateKnowledgeBase::decl(),
        RetrainSchedule::decl(),
        KnowledgeBaseDetail::decl(),
        Document::decl(),
        DocumentKind::decl(),
        DocumentStatus::decl(),
        UploadProgress::decl(),
        ScrapeUrlRequest::decl(),
        AddTextRequest::decl(),
        Chatbot::decl(),
        CreateChatbot::decl(),
        ChatbotSummary::decl(),
        ModelOption::decl(),
        EmbedCode::decl(),
        TestChatView::decl(),
        SendMessageRequest::decl(),
        ChatMessage::decl(),
        ChatRole::decl(),
        ChatState::decl(),
        IgnoreReason::decl(),
        SendOutcome::decl(),
        DashboardResponse::decl(),
        DashboardOverview::decl(),
        RecentKnowledgeBase::decl(),
        RecentChatbot::decl(),
        IntegrationsView::decl(),
        Integration::decl(),
        IntegrationKind::decl(),
        IntegrationStatus::decl(),
        IntegrationType::decl(),
        SetupIntegrationRequest::decl(),
        AnalyticsQuery::decl(),
        TimeRange::decl(),
        AnalyticsReport::decl(),
        AnalyticsData::decl(),
        TopQuestion::decl(),
        DailyMessages::decl(),
        HourlyResponseTime::decl(),
        BotPerformance::decl(),
        BotPerformanceRow::decl(),
        PerformanceTier::decl(),
        MarketingPage::decl(),
        Hero::decl(),
        Feature::decl(),
        IntegrationTeaser::decl(),
        PricingPlan::decl(),
    ];
    let body = decls
        .into_iter()
        .map(|decl| {
            if decl.starts_with("export") {
                decl
            } else {
                format!("export {decl}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{header}{body}\n")
}

fn main() -> std::io::Result<()> {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path).unwrap_or_default();
        if current == generated {
            println!("shared/types.ts is up to date.");
            std::process::exit(0);
        }
        eprintln!("shared/types.ts is out of date. Run `cargo run --bin generate_types`.");
        std::process::exit(1);
    }

    fs::create_dir_all(&shared_path)?;
    fs::write(&types_path, generated)?;
    println!("Wrote {}", types_path.display());
    Ok(())
}
