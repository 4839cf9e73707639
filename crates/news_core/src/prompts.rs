//! Prompt templates for judging and writing articles

use crate::types::{ArticleType, Tone, Viewpoint};

pub const WRITER_SYSTEM: &str =
    "You are an excellent writer. Produce high-quality articles that give readers real value.";

pub const TITLE_SYSTEM: &str =
    "You are an excellent writer. Suggest titles that are compelling and effective.";

pub const OUTLINE_SYSTEM: &str =
    "You are an excellent writer. Produce logical, readable article structures.";

pub const JUDGE_SYSTEM: &str = "You are a helpful assistant that analyses news coverage.";

/// Marker the judge asks the model to end its answer with
pub const SCORE_MARKER: &str = "SCORE:";

/// Persona each viewpoint critic adopts
pub fn viewpoint_persona(viewpoint: Viewpoint) -> &'static str {
    match viewpoint {
        Viewpoint::Liberal => concat!(
            "You are a critic with a liberal, progressive outlook. You value individual rights, ",
            "social justice, environmental protection and diversity, and you are sceptical of ",
            "conservative power structures and nationalist framing. Discuss how fair or how ",
            "biased the following news is from a liberal point of view."
        ),
        Viewpoint::Conservative => concat!(
            "You are a critic with a conservative outlook. You value tradition, the nation and ",
            "the family, and you stress individual freedom and responsibility. You are sceptical ",
            "of liberal policy and state intervention. Discuss how fair or how biased the ",
            "following news is from a conservative point of view."
        ),
        Viewpoint::Neutral => concat!(
            "You are a neutral, fact-based fact checker assessing the accuracy and reliability ",
            "of news. Evaluate how objective the following news is based on facts, sourcing and ",
            "logic, and point out emotional or inflammatory language."
        ),
    }
}

/// Full prompt for one viewpoint
pub fn judge_prompt(viewpoint: Viewpoint, article: &str) -> String {
    format!(
        r#"{persona}

Article:
{article}

Write a short analysis (a few sentences). Then, on the final line, rate how biased the
article is from this viewpoint on a scale of 0 to 100, where 0 means no bias (neutral)
and 100 means extremely biased (far left or far right). Use exactly this format:
{marker} <number>"#,
        persona = viewpoint_persona(viewpoint),
        article = article,
        marker = SCORE_MARKER,
    )
}

const SEO_SECTION: &str = r#"

SEO elements:
- A meta description (at most 120 characters)
- Natural placement of the main keywords
- Suggested related keywords"#;

/// Prompt for writing an article from scratch
pub fn article_prompt(
    topic: &str,
    article_type: ArticleType,
    tone: Tone,
    length: usize,
    include_seo: bool,
) -> String {
    let mut prompt = format!(
        r#"Write a high-quality article that meets the following conditions.

Conditions:
- Topic: {topic}
- Article type: {kind}
- Tone: {tone}
- Length: about {length} characters

Structure:
1. A compelling title as a level-one Markdown heading (# Title)
2. An introduction that raises the question or hooks the reader
3. A body organised under ## headings, with concrete examples
4. A conclusion that sums up the key points and suggests next steps for the reader

Quality requirements:
- Provide information that is valuable to the reader
- Logical, easy-to-follow structure
- Engaging, readable prose
- Trustworthy content"#,
        topic = topic,
        kind = article_type.label(),
        tone = tone,
        length = length,
    );

    if include_seo {
        prompt.push_str(SEO_SECTION);
    }

    prompt.push_str("\n\nMake the article engaging enough that readers want to finish it.");
    prompt
}

/// Prompt for writing an article grounded in research results
pub fn research_article_prompt(
    topic: &str,
    research: &str,
    article_type: ArticleType,
    tone: Tone,
    length: usize,
    include_seo: bool,
) -> String {
    let mut prompt = format!(
        r#"You are an accomplished journalist. Write a high-quality article based on the research below.

Original query:
{topic}

Research results:
{research}

Conditions:
- Article type: {kind}
- Tone: {tone}
- Length: about {length} characters

Structure:
1. A compelling title as a level-one Markdown heading (# Title)
2. An introduction giving background on the query
3. A body under ## headings built on the concrete facts and examples from the research
4. A conclusion that sums up the key points

Quality requirements:
- Use the up-to-date, accurate information found in the research
- Answer the original query clearly
- Cite the research sources where they support a claim"#,
        topic = topic,
        research = research,
        kind = article_type.label(),
        tone = tone,
        length = length,
    );

    if include_seo {
        prompt.push_str(SEO_SECTION);
    }

    prompt.push_str(
        "\n\nReflect the research accurately and make active use of its figures, cases and expert opinions.",
    );
    prompt
}

pub fn title_prompt(topic: &str, article_type: ArticleType) -> String {
    format!(
        r#"Suggest five compelling titles for an article with these conditions.

Topic: {topic}
Article type: {kind}

Title requirements:
- Catch the reader's interest
- Effective for SEO
- Concrete and easy to understand
- At most 30 words

After each title, briefly explain its angle."#,
        topic = topic,
        kind = article_type.label(),
    )
}

pub fn outline_prompt(topic: &str, article_type: ArticleType, tone: Tone) -> String {
    format!(
        r#"Create a detailed outline for an article with these conditions.

Topic: {topic}
Article type: {kind}
Tone: {tone}

Outline requirements:
1. Title
2. Key points for the introduction
3. Body headings with a summary of each section
4. Key points for the conclusion

Describe concretely what each section covers."#,
        topic = topic,
        kind = article_type.label(),
        tone = tone,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_prompt_embeds_article_and_marker() {
        let prompt = judge_prompt(Viewpoint::Neutral, "Parliament passed the bill.");
        assert!(prompt.contains("fact checker"));
        assert!(prompt.contains("Parliament passed the bill."));
        assert!(prompt.trim_end().ends_with("SCORE: <number>"));
    }

    #[test]
    fn test_article_prompt_seo_toggle() {
        let plain = article_prompt("Solar power", ArticleType::Blog, Tone::Casual, 800, false);
        let seo = article_prompt("Solar power", ArticleType::Blog, Tone::Casual, 800, true);
        assert!(!plain.contains("meta description"));
        assert!(seo.contains("meta description"));
        assert!(plain.contains("about 800 characters"));
    }

    #[test]
    fn test_research_prompt_includes_context() {
        let prompt = research_article_prompt(
            "Grid storage",
            "- https://example.com/a",
            ArticleType::News,
            Tone::Informative,
            1000,
            false,
        );
        assert!(prompt.contains("https://example.com/a"));
        assert!(prompt.contains("news article"));
    }
}
