//! Router and finalizer prompt building.

use crate::decision::Route;
use crate::llm::ChatMessage;
use crate::sanitizer::FinalizationSanitizer;
use crate::tools::ToolResult;

/// Router system instructions (constant part)
const ROUTER_INSTRUCTIONS: &str = r#"You route requests for a Turkish personal assistant. Output ONE JSON object only:
{"route":"<calendar|gmail|system|smalltalk|wiki|chat|unknown>","calendar_intent":"<create|modify|cancel|delete|query|none>","gmail_intent":"<list|search|read|send|reply|forward|delete|mark_read|none>","slots":{},"confidence":0.9,"tool_plan":[],"assistant_reply":"","ask_user":false,"question":"","requires_confirmation":false,"confirmation_prompt":"","memory_update":"","reasoning_summary":[]}

Rules:
- tool_plan is a JSON list of tool names from TOOLS, in execution order.
- Calendar writes need a date, time or window_hint slot.
- Set requires_confirmation for create/modify/delete/send and write confirmation_prompt in Turkish.
- assistant_reply, question and confirmation_prompt are Turkish and address the user as "efendim".
- If the request is unclear set ask_user=true and put a Turkish question in question.
- Use ids from ENTITIES when the user refers to something mentioned earlier.
JSON ONLY."#;

/// Finalizer system instructions
const FINALIZER_INSTRUCTIONS: &str = r#"Sen Türkçe konuşan kişisel bir asistansın.
Kurallar:
- Yalnızca Türkçe yanıt ver, kullanıcıya "efendim" diye hitap et.
- Yalnızca aşağıdaki araç sonuçlarındaki bilgileri kullan, bilgi uydurma.
- Bir araç başarısız olduysa bunu kısaca ve sakin bir dille söyle.
- Kısa ve net ol."#;

/// Fine-tuning for the quality tier
const QUALITY_ADDENDUM: &str =
    "- Metin yazman istendiyse akıcı, düzgün ve eksiksiz bir taslak hazırla.";

/// Messages for one router call.
pub fn build_router_messages(
    user_text: &str,
    tool_names: &[String],
    entity_block: &str,
    memory: &[String],
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    let mut system = String::from(ROUTER_INSTRUCTIONS);
    system.push_str("\n\nTOOLS: ");
    system.push_str(&tool_names.join(", "));
    if !entity_block.is_empty() {
        system.push_str("\nENTITIES: ");
        system.push_str(entity_block);
    }
    if !memory.is_empty() {
        system.push_str("\nMEMORY:\n");
        for note in memory {
            system.push_str("- ");
            system.push_str(note);
            system.push('\n');
        }
    }

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(user_text));
    messages
}

/// Messages for the repair re-prompt. `raw_output` must already be sanitized.
pub fn build_repair_messages(raw_output: &str, error_kind: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "{}\n\nYour previous output could not be used ({}). Return only the corrected JSON object.",
            ROUTER_INSTRUCTIONS, error_kind
        )),
        ChatMessage::user(raw_output),
    ]
}

/// Messages for the finalizer. Tool output is sanitized before it is inlined.
pub fn build_finalizer_messages(
    user_text: &str,
    route: Route,
    tool_results: &[ToolResult],
    memory: &[String],
    quality: bool,
    sanitizer: &FinalizationSanitizer,
) -> Vec<ChatMessage> {
    let mut system = String::from(FINALIZER_INSTRUCTIONS);
    if quality {
        system.push('\n');
        system.push_str(QUALITY_ADDENDUM);
    }
    system.push_str(&format!("\n\nKonu: {}", route));

    if !memory.is_empty() {
        system.push_str("\nKullanıcı hakkında notlar:\n");
        for note in memory {
            system.push_str(&format!("- {}\n", note));
        }
    }

    if !tool_results.is_empty() {
        system.push_str("\nAraç sonuçları:\n");
        for result in tool_results {
            let line = if result.success {
                sanitizer.sanitize_raw_text(&result.raw_result.to_string())
            } else {
                format!("HATA: {}", sanitizer.sanitize_tool_error(result.error.as_deref()))
            };
            system.push_str(&format!("- {}: {}\n", result.tool, line));
        }
    }

    vec![ChatMessage::system(system), ChatMessage::user(user_text)]
}
