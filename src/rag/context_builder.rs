//! Context block and prompt composition.

use crate::outlets::Outlet;

/// One line per outlet, in match-rank order.
pub fn build_context(outlets: &[Outlet]) -> String {
    outlets
        .iter()
        .map(Outlet::context_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Merges the context block and the live question into the generator prompt.
///
/// The wording may change freely as long as it keeps presenting the outlet
/// data, the current question, and the hint that earlier turns are available.
pub fn compose_prompt(context: &str, question: &str) -> String {
    format!(
        "Using the outlet data below and our conversation so far, answer the question \
concisely in a clear, structured way. Do not use markdown or asterisks.\n\
\n\
Outlet Data:\n\
{context}\n\
\n\
Earlier questions and answers in this conversation are available to you.\n\
\n\
Current Question: {question}\n\
\n\
If the question refers to something said earlier, combine that with the outlet data \
to answer accurately. If the outlet data does not contain the answer, say so."
    )
}
