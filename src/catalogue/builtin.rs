//! Catalogue compiled into the binary.
//!
//! Each entry points at `catalogue/<name>/` in the source tree. Keep this list
//! and the directory in step: `chat-template-fixup check` reports drift.

pub struct BuiltinEntry {
    pub name: &'static str,
    pub original: &'static [u8],
    pub replacement: &'static [u8],
    pub manifest: &'static str,
}

macro_rules! entry {
    ($name:literal) => {
        BuiltinEntry {
            name: $name,
            original: include_bytes!(concat!("../../catalogue/", $name, "/original.jinja")),
            replacement: include_bytes!(concat!("../../catalogue/", $name, "/replacement.jinja")),
            manifest: include_str!(concat!("../../catalogue/", $name, "/entry.toml")),
        }
    };
}

pub static BUILTIN: &[BuiltinEntry] = &[
    // calme-2.1-phi3.5-4b.Q6_K.gguf, Phi-3.5-mini-instruct-Q4_0.gguf (ThilotE on Discord, nomic-ai/gpt4all#3345)
    entry!("phi-3.5-mini-instruct"),
    // DeepSeek-R1-Distill-Qwen-7B-Q4_0.gguf
    entry!("deepseek-r1-distill-qwen"),
    // gemma-2-9b-it-Q4_0.gguf (nomic-ai/gpt4all#3282)
    entry!("gemma-2-it"),
    // ghost-7b-v0.9.1-Q4_0.gguf
    entry!("ghost-7b"),
    // Hermes-3-Llama-3.2-3B.Q4_0.gguf, mistral-7b-openorca.gguf2.Q4_0.gguf
    entry!("hermes-3-chatml"),
    // ibm-granite/granite-3.1-3b-a800m-instruct.gguf, ibm-granite/granite-3.1-8b-instruct.gguf (nomic-ai/gpt4all#3159)
    entry!("granite-3.1-instruct"),
    // Llama-3.2-1B-Instruct-Q4_0.gguf, Llama-3.2-3B-Instruct-Q4_0.gguf, SummLlama3.2-3B-Q4_0.gguf (nomic-ai/gpt4all#3309)
    entry!("llama-3.2-instruct"),
    // Llama-3.3-70B-Instruct-Q4_0.gguf (nomic-ai/gpt4all#3305)
    entry!("llama-3.3-instruct"),
    // Llama3-DiscoLeo-Instruct-8B-32k-v0.1-Q4_0.gguf (nomic-ai/gpt4all#3347)
    entry!("llama3-discoleo-instruct"),
    // Meta-Llama-3.1-8B-Instruct-128k-Q4_0.gguf
    entry!("llama-3.1-instruct-128k"),
    // Meta-Llama-3-8B-Instruct.Q4_0.gguf
    entry!("llama-3-instruct"),
    // Mistral-Nemo-Instruct-2407-Q4_0.gguf (nomic-ai/gpt4all#3284)
    entry!("mistral-nemo-instruct"),
    // Nous-Hermes-2-Mistral-7B-DPO.Q4_0.gguf
    entry!("nous-hermes-2-mistral-dpo"),
    // occiglot-7b-de-en-instruct.Q4_0.gguf (nomic-ai/gpt4all#3283)
    entry!("occiglot-7b-de-en-instruct"),
    // allenai/OLMoE-1B-7B-0924-Instruct-GGUF (nomic-ai/gpt4all#3053)
    entry!("olmoe-1b-7b-instruct"),
    // Phi-3.1-mini-128k-instruct-Q4_0.gguf (nomic-ai/gpt4all#3346)
    entry!("phi-3.1-mini-128k-instruct"),
    // Phi-3-mini-4k-instruct.Q4_0.gguf
    entry!("phi-3-mini-4k-instruct"),
    // qwen2-1_5b-instruct-q4_0.gguf, qwen2-72b-instruct-q4_0.gguf (nomic-ai/gpt4all#3263)
    entry!("qwen2-instruct"),
];
