use chrono::NaiveDate;
use minijinja::{context, Environment, Error, ErrorKind, Value};
use regex::Regex;

use super::corpus::{Conversation, Corpus};

/// Which flavour of jinja a template is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineProfile {
    /// Stands in for the engine model authors write against: Python string
    /// and dict methods plus `strftime_now`.
    Reference,
    /// Stands in for the engine that actually runs the template. It has
    /// `strftime_now` and a `regex_replace` filter but no Python methods.
    Constrained,
}

pub fn environment(profile: EngineProfile, today: NaiveDate) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_function("raise_exception", raise_exception);
    env.add_function("strftime_now", move |format: String| strftime(today, &format));

    match profile {
        EngineProfile::Reference => {
            env.set_unknown_method_callback(minijinja_contrib::pycompat::unknown_method_callback);
        }
        EngineProfile::Constrained => {
            env.add_filter("regex_replace", regex_replace);
        }
    }
    env
}

fn raise_exception(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

fn regex_replace(value: String, pattern: String, replacement: String) -> Result<String, Error> {
    let re = Regex::new(&pattern).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, format!("bad pattern `{pattern}`")).with_source(e)
    })?;
    Ok(re.replace_all(&value, replacement.as_str()).into_owned())
}

fn strftime(today: NaiveDate, format: &str) -> Result<String, Error> {
    use std::fmt::Write;

    let mut out = String::new();
    write!(out, "{}", today.format(format)).map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid strftime format `{format}`"),
        )
    })?;
    Ok(out)
}

pub fn render(
    env: &Environment<'_>,
    source: &str,
    corpus: &Corpus,
    conversation: &Conversation,
) -> Result<String, Error> {
    let template = env.template_from_str(source)?;
    template.render(context! {
        messages => &conversation.messages,
        add_generation_prompt => conversation.add_generation_prompt,
        bos_token => &corpus.bos_token,
        eos_token => &corpus.eos_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Message, Role};

    fn corpus() -> Corpus {
        Corpus {
            bos_token: "<s>".to_string(),
            eos_token: "</s>".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 7, 26),
            conversations: vec![],
        }
    }

    fn hello() -> Conversation {
        Conversation {
            name: "hello".to_string(),
            add_generation_prompt: true,
            messages: vec![Message::new(Role::User, "hello </think> world")],
        }
    }

    #[test]
    fn strftime_now_uses_corpus_date() {
        let corpus = corpus();
        let source = "{% if strftime_now is defined %}{{ strftime_now('%d %b %Y') }}{% else %}none{% endif %}";

        for profile in [EngineProfile::Reference, EngineProfile::Constrained] {
            let env = environment(profile, corpus.today());
            assert_eq!(render(&env, source, &corpus, &hello()).unwrap(), "26 Jul 2024");
        }
    }

    #[test]
    fn regex_replace_strips_reasoning() {
        let corpus = corpus();
        let source = r"{{ messages[0]['content'] | regex_replace('^[\\s\\S]*</think>', '') }}";

        let constrained = environment(EngineProfile::Constrained, corpus.today());
        assert_eq!(render(&constrained, source, &corpus, &hello()).unwrap(), " world");

        let reference = environment(EngineProfile::Reference, corpus.today());
        assert!(render(&reference, source, &corpus, &hello()).is_err());
    }

    #[test]
    fn regex_replace_rejects_bad_pattern() {
        let corpus = corpus();
        let env = environment(EngineProfile::Constrained, corpus.today());
        let err = render(&env, "{{ 'x' | regex_replace('(', '') }}", &corpus, &hello()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn python_methods_only_in_reference() {
        let corpus = corpus();
        let source = "{{ messages[0]['content'].split('</think>')[-1] }}";

        let reference = environment(EngineProfile::Reference, corpus.today());
        assert_eq!(render(&reference, source, &corpus, &hello()).unwrap(), " world");

        let constrained = environment(EngineProfile::Constrained, corpus.today());
        assert!(render(&constrained, source, &corpus, &hello()).is_err());
    }

    #[test]
    fn raise_exception_carries_message() {
        let corpus = corpus();
        let env = environment(EngineProfile::Constrained, corpus.today());
        let err = render(&env, "{{ raise_exception('nope') }}", &corpus, &hello()).unwrap_err();
        assert_eq!(err.detail(), Some("nope"));
    }

    #[test]
    fn block_whitespace_is_trimmed() {
        let corpus = corpus();
        let env = environment(EngineProfile::Constrained, corpus.today());
        let source = "{{ bos_token }}\n{% for message in messages %}\n    {{ message['role'] }}\n{% endfor %}";
        assert_eq!(render(&env, source, &corpus, &hello()).unwrap(), "<s>\n    user\n");
    }
}
