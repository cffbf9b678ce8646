pub const SUMMARY_SYSTEM: &str =
    "You help founders spot emerging micro-niches. Answer in plain prose, no lists, no preamble.";

pub const PROBE_PROMPT: &str = "Say hello like a pirate.";

pub fn summary_prompt(title: &str, comments: &[String]) -> String {
    let mut out = String::new();
    out.push_str("Summarize the discussion below in 2-3 sentences. ");
    out.push_str("Focus on the pain points, requests and product ideas people raise.\n\n");
    out.push_str(&format!("Post title: {title}\n\nTop comments:\n"));
    for c in comments {
        // keep each comment on one line so the list stays readable
        let flat = c.split_whitespace().collect::<Vec<_>>().join(" ");
        out.push_str(&format!("- {flat}\n"));
    }
    out
}

pub fn trend_prompt(keyword: &str) -> String {
    format!(
        "You are a trend researcher. Analyze this phrase and reply with only a JSON object with keys:\n\
         - \"title\": a short catchy trend title\n\
         - \"description\": what the trend is and why it is interesting (1-2 sentences)\n\
         - \"category\": one of \"travel\", \"health\", \"finance\", \"tech\"\n\
         - \"ideas\": an array of 2 short content ideas (blog post, video, newsletter...)\n\n\
         Trend keyword: \"{}\"",
        keyword.replace('"', "'")
    )
}
