//! Prompt templates for every pipeline stage.
//!
//! Templates use `{name}` placeholders filled with [`fill`].

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

pub const RESEARCH_QUERY_PROMPT: &str = r#"You are a research query generator. Analyze the user's query deeply to understand their core research needs and generate targeted search queries.
Use your own knowledge to improve the plan: if something beyond what the user asked is worth researching, include it.

1. Identify the main topics, subtopics and specific aspects mentioned in the query.
2. Consider different angles, perspectives and related areas for comprehensive coverage.
3. Generate search queries that:
    - are highly specific and distinct from each other
    - approach the topic from radically different angles
    - use precise technical and domain-specific terminology
    - target niche subtopics and specialized aspects
    - include contrasting viewpoints
    - focus on concrete case studies and examples
    - examine connections with other fields
    - look for cutting-edge research and emerging trends
    - seek expert analysis and authoritative sources
    - consider historical context and future implications

Return a JSON object with this structure:
{
    "user_prompt": "Original user query",
    "topic_analysis": "Your detailed analysis of main topics and research angles",
    "search_queries": ["10 highly distinct, specific search queries"]
}

User Query: {query}"#;

pub const RESEARCH_SEARCH_SYSTEM: &str = "You are a highly analytical research assistant focused on evidence-based findings. Your task is to:
1. Deeply analyze the query to understand the core research needs
2. Provide strictly factual information supported by reliable sources
3. Focus on recent, peer-reviewed research and authoritative sources
4. Draw precise conclusions that directly address the query context
5. Prioritize accuracy and relevance over breadth
6. Cite specific studies, papers, or expert sources where possible
7. Highlight important caveats or limitations in the findings

Keep the response concise, well-structured and strictly factual.";

pub const RESEARCH_SYNTHESIS_PROMPT: &str = "Original user query: {query}

Research findings:
{findings}

Analyze these findings and synthesize them into a clear, engaging answer that directly addresses the user's needs:

1. Keep only information relevant to the original query
2. Explain complex concepts in simple language
3. Structure the answer so it holds the reader's interest
4. Highlight key insights and practical takeaways
5. Drop anything that does not help answer the question
6. Use clear examples and analogies where helpful
7. Write in a conversational tone while staying accurate

Also include:
- A brief summary of the main points and key takeaways
- Simple, actionable advice on what to do next with this information
- Bullet points or lists where they improve readability

Make the output concrete, with detailed action steps when it makes sense.";

// ---------------------------------------------------------------------------
// Outreach
// ---------------------------------------------------------------------------

pub const OUTREACH_QUERY_SYSTEM: &str = "You are an expert in market research and lead generation. Provide ONLY the search queries, nothing else: a list of 5 search queries, one per line.";

pub const OUTREACH_QUERY_PROMPT: &str = "Generate a list of 5 search queries to recognize potential clients' interests, needs, pain points, and challenges in this industry: #### {industry} ####";

pub const OUTREACH_SEARCH_SYSTEM: &str = "You are a research assistant. Search the web and provide detailed, factual results about market situations, trends, and opportunities.";

pub const OUTREACH_SEARCH_PROMPT: &str = "Search the web for: {query}
Provide specific companies' problems, needs, and challenges. Format the response as a structured list.";

pub const OUTREACH_DRAFT_SYSTEM: &str = "You are a marketing assistant helping with cold outreach based on the market situation, trends, and opportunities.";

pub const OUTREACH_DRAFT_PROMPT: &str = "Based on these search results about '{query}':

{results}

Draft personalized outreach messages for companies, highlighting specific details about common problems, needs, and challenges in their industry.";

// ---------------------------------------------------------------------------
// Videos
// ---------------------------------------------------------------------------

pub const VIDEO_ANALYSIS_SYSTEM: &str = "You are an AI assistant specializing in YouTube channel analysis and data formatting. Your expertise includes:
- Analyzing YouTube channel metrics and trends
- Formatting raw data into clean, readable markdown
- Identifying patterns in video performance
- Providing insights about content strategy

Format your response in clean markdown, using headers, lists, and tables where relevant.";

pub const VIDEO_ANALYSIS_PROMPT: &str = "I've scraped data from a YouTube channel. Here's the raw data:

Channel URL: {channel}
Total Videos Analyzed: {count}

Raw video data:
{summary}

Please:
1. Format this data into a clean, readable markdown report
2. Analyze the view counts and upload patterns
3. Identify any trends or patterns in the video titles
4. Provide insights about what types of content perform best
5. Include a summary table of the top performing videos

Format the response in markdown with clear sections.";

// ---------------------------------------------------------------------------
// Change tracker
// ---------------------------------------------------------------------------

pub const CHANGE_SUMMARY_PROMPT: &str = "Analyze these code and file changes and provide a clear, organized summary:

{changes}

Please provide:
1. A concise bullet-point list of significant changes
2. Focus on functional changes (ignore formatting changes)
3. Group related changes together
4. Highlight any new features or important modifications
5. Mention any new files or major file changes

Format the response as markdown-compatible text.";

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub const TASK_PRIORITY_PROMPT: &str = "Given these existing tasks with priorities:

{tasks}

Analyze this new task: \"{task}\"
Analyze the existing tasks and this new task. Your response should follow this format:
1. List the existing tasks in priority order (from highest to lowest)
2. Explain your reasoning for where the new task fits
3. State where the new task belongs in the priority order

Respond ONLY with these 3 sections, no other text.";

// ---------------------------------------------------------------------------
// Advisor
// ---------------------------------------------------------------------------

pub const ADVISOR_CLARITY_SYSTEM: &str =
    "You are a clarity expert. Help entrepreneurs understand how they can monetize their skills with AI.";

pub const ADVISOR_NICHE_SYSTEM: &str =
    "You are a niche expert. Help identify specific target market and ideal customer avatar.";

pub const ADVISOR_NICHE_PROMPT: &str =
    "Based on this information, help identify the perfect niche and target avatar: {clarity}";

pub const ADVISOR_ACTION_SYSTEM: &str =
    "You are an action expert. Provide specific, actionable steps for business growth.";

pub const ADVISOR_ACTION_PROMPT: &str = "Create an action plan based on this information: {niche}";

pub const ADVISOR_STRATEGY_SYSTEM: &str = "You are an expert business strategist. Present a comprehensive business strategy with clear, actionable steps. Your response should: 1) Summarize the core business concept and target market, 2) List specific, prioritized action steps with timelines, 3) Address potential challenges and provide solutions, 4) Include risk mitigation strategies, and 5) Highlight key success metrics. Be direct, practical, and thorough while anticipating common concerns or objections the entrepreneur might have.";

pub const ADVISOR_STRATEGY_PROMPT: &str = "Based on the user's original input: \"{idea}\"

Summarize this business strategy:
Clarity Analysis: {clarity}
Niche Analysis: {niche}
Action Plan: {action}";

pub const ADVISOR_FOLLOW_UP_SYSTEM: &str =
    "You are a helpful business advisor. Answer questions about the previously provided business strategy.";

pub const ADVISOR_FOLLOW_UP_PROMPT: &str = "Previous strategy: {strategy}

User question: {question}";

// ---------------------------------------------------------------------------
// Datagen
// ---------------------------------------------------------------------------

pub const DATAGEN_ANALYZER_SYSTEM: &str = "You are an AI assistant specialized in analyzing data and generating insights. Your task is to help users understand their CSV data and generate meaningful analysis.";

pub const DATAGEN_ANALYZER_PROMPT: &str = "Please analyze this dataset with the following objectives:
1. Identify the main patterns and trends
2. Highlight any anomalies or interesting findings
3. Identify key relationships between columns
4. Describe the data types and formats used

Dataset details:
{sample}";

pub const DATAGEN_SUMMARY_SYSTEM: &str = "You are an AI assistant that creates clear, concise summaries.";

pub const DATAGEN_SUMMARY_PROMPT: &str = "Summarize the following analysis in one clear paragraph:
{analysis}";

pub const DATAGEN_GENERATOR_SYSTEM: &str = "You are a data generator that creates CSV rows matching an existing dataset.
Each row MUST have exactly {arity} columns in this order: {columns}

IMPORTANT:
- Use quotes around each field
- Separate fields with commas
- One complete row per line
- No headers or explanations
- Only output the data rows";

pub const DATAGEN_GENERATOR_PROMPT: &str = "Generate exactly {count} new rows.
Each row must have these {arity} columns: {columns}.

Format requirements:
- Each field must be in quotes
- Fields separated by commas
- One complete row per line
- No headers or extra text

Sample data for reference:
{sample}

Analysis context:
{analysis}

Generate exactly {count} rows following this format.";

/// Replace each `{key}` in `template` with its value.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{key}}}"), value)
    })
}
