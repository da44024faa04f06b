use lexrag_core::types::ScoredSource;

/// Plain question, no injected context.
pub fn generation_only_prompt(query: &str) -> String {
    format!(
        "You are an expert legal scholar. Answer this legal question:\n\n{query}\n\n\
         Provide a comprehensive legal analysis with relevant principles and examples."
    )
}

/// Question plus numbered source previews.
pub fn retrieval_prompt(query: &str, sources: &[ScoredSource]) -> String {
    let context: String = sources.iter().enumerate().map(|(i, source)| {
        let label = match source.page {
            Some(page) => format!("[Source {}: {}, page {}]", i + 1, source.source_name, page),
            None => format!("[Source {}: {}]", i + 1, source.source_name),
        };
        format!("{label}\n{}\n\n", source.preview)
    }).collect();
    format!(
        "You are an expert legal scholar. Answer the legal question below, using the provided legal sources where relevant.\n\n\
         Legal sources:\n{context}\
         Question: {query}\n\n\
         Provide a comprehensive legal analysis with relevant principles and examples, citing sources by number."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, page: Option<u32>, preview: &str) -> ScoredSource {
        ScoredSource { chunk_id: format!("{name}:0"), source_name: name.into(), page, preview: preview.into(), score: 0.9 }
    }

    #[test]
    fn retrieval_prompt_labels_each_source() {
        let prompt = retrieval_prompt("What is negligence?", &[
            source("torts.pdf", Some(4), "Negligence requires duty."),
            source("notes.txt", None, "Breach is measured objectively."),
        ]);
        assert!(prompt.contains("[Source 1: torts.pdf, page 4]\nNegligence requires duty."));
        assert!(prompt.contains("[Source 2: notes.txt]\nBreach is measured objectively."));
        assert!(prompt.contains("Question: What is negligence?"));
    }

    #[test]
    fn generation_only_prompt_has_no_sources() {
        let prompt = generation_only_prompt("What is negligence?");
        assert!(prompt.contains("What is negligence?"));
        assert!(!prompt.contains("[Source"));
    }
}
