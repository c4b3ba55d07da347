//! Business advisor: four chained model "agents" turn an idea into a
//! strategy, which then answers follow-up questions.

use promptkit_providers::{ChatModel, ChatRequest};
use promptkit_shared::Result;
use tracing::instrument;

use crate::pipeline::{ProgressReporter, ask};
use crate::prompts::{self, fill};

/// Output of every stage of one consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consultation {
    pub idea: String,
    pub clarity: String,
    pub niche: String,
    pub action_plan: String,
    pub strategy: String,
}

async fn agent(chat: &dyn ChatModel, model: &str, system: &str, user: String) -> Result<String> {
    ask(chat, ChatRequest::new(model).system(system).user(user)).await
}

pub async fn clarity(chat: &dyn ChatModel, model: &str, idea: &str) -> Result<String> {
    agent(chat, model, prompts::ADVISOR_CLARITY_SYSTEM, idea.to_string()).await
}

pub async fn niche(chat: &dyn ChatModel, model: &str, clarity: &str) -> Result<String> {
    let prompt = fill(prompts::ADVISOR_NICHE_PROMPT, &[("clarity", clarity)]);
    agent(chat, model, prompts::ADVISOR_NICHE_SYSTEM, prompt).await
}

pub async fn action_plan(chat: &dyn ChatModel, model: &str, niche: &str) -> Result<String> {
    let prompt = fill(prompts::ADVISOR_ACTION_PROMPT, &[("niche", niche)]);
    agent(chat, model, prompts::ADVISOR_ACTION_SYSTEM, prompt).await
}

/// Combine the idea and the three analyses into the final strategy.
pub async fn final_strategy(
    chat: &dyn ChatModel,
    model: &str,
    idea: &str,
    clarity: &str,
    niche: &str,
    action: &str,
) -> Result<String> {
    let prompt = fill(
        prompts::ADVISOR_STRATEGY_PROMPT,
        &[("idea", idea), ("clarity", clarity), ("niche", niche), ("action", action)],
    );
    agent(chat, model, prompts::ADVISOR_STRATEGY_SYSTEM, prompt).await
}

/// Answer a question about a strategy produced earlier.
#[instrument(skip_all, fields(model = %model))]
pub async fn answer_follow_up(
    chat: &dyn ChatModel,
    model: &str,
    strategy: &str,
    question: &str,
) -> Result<String> {
    let prompt = fill(
        prompts::ADVISOR_FOLLOW_UP_PROMPT,
        &[("strategy", strategy), ("question", question)],
    );
    agent(chat, model, prompts::ADVISOR_FOLLOW_UP_SYSTEM, prompt).await
}

/// Run the four stages in order.
#[instrument(skip_all, fields(model = %model))]
pub async fn consult(
    chat: &dyn ChatModel,
    model: &str,
    idea: &str,
    progress: &dyn ProgressReporter,
) -> Result<Consultation> {
    progress.phase("Clarity agent is analyzing your idea");
    let clarity = clarity(chat, model, idea).await?;

    progress.phase("Niche agent is identifying your target market");
    let niche = niche(chat, model, &clarity).await?;

    progress.phase("Action agent is creating your plan");
    let action_plan = action_plan(chat, model, &niche).await?;

    progress.phase("Strategist is finalizing your strategy");
    let strategy = final_strategy(chat, model, idea, &clarity, &niche, &action_plan).await?;

    progress.done("Strategy ready");
    Ok(Consultation {
        idea: idea.to_string(),
        clarity,
        niche,
        action_plan,
        strategy,
    })
}
