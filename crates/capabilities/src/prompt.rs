//! Prompt templates. Every prompt is built from already-redacted text.

/// Messages of context given to the reply generator.
pub const REPLY_CONTEXT_MESSAGES: usize = 5;

pub fn summary(transcript: &str) -> String {
    format!(
        "You are an assistant helping to summarize customer support conversations.\n\
         Create a concise, professional summary of the following conversation that captures:\n\
         - Main reason for contact\n\
         - Key information provided by the customer\n\
         - Actions taken or promised\n\
         - Any follow-up needed\n\
         \n\
         Conversation:\n\
         {transcript}\n\
         \n\
         Provide a summary in 3-5 bullet points."
    )
}

pub fn smart_replies(context: &str, last_message: &str, count: usize) -> String {
    format!(
        "You are an assistant helping a contact center agent respond to a customer.\n\
         Based on the conversation context below, suggest {count} appropriate next responses.\n\
         \n\
         Conversation Context:\n\
         {context}\n\
         \n\
         Customer's Last Message: {last_message}\n\
         \n\
         Generate {count} response suggestions that are:\n\
         - Professional and empathetic\n\
         - Compliant with regulated communication standards\n\
         - Actionable and helpful\n\
         - Brief (1-2 sentences each)\n\
         \n\
         Format as JSON array of strings."
    )
}

pub fn knowledge(query: &str) -> String {
    format!(
        "Based on the following query from a contact center agent,\n\
         provide a brief, actionable knowledge snippet (2-3 sentences) that would help them respond.\n\
         \n\
         Query: {query}\n\
         \n\
         Provide practical, compliant information."
    )
}
