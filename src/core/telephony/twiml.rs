//! TwiML documents for the voice webhooks.

use std::fmt::Write;

/// Content type of every webhook response.
pub const TWIML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// How `<Say>` is voiced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SayOptions {
    /// Telephony TTS voice
    pub voice: String,
    /// BCP-47 language tag
    pub language: String,
}

impl Default for SayOptions {
    fn default() -> Self {
        Self {
            voice: "alice".to_string(),
            language: "fi-FI".to_string(),
        }
    }
}

/// Speech gather step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherOptions {
    /// Webhook that receives `SpeechResult`
    pub action: String,
    /// Seconds of silence that end the caller's speech
    pub speech_timeout_secs: u32,
    /// Seconds to wait for speech to start before giving up
    pub timeout_secs: u32,
    /// Recognition language
    pub language: String,
}

/// Incrementally builds a `<Response>` document. Text and attributes are escaped.
#[derive(Debug, Default)]
pub struct TwimlBuilder {
    body: String,
}

impl TwimlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: &str, options: &SayOptions) -> Self {
        let _ = writeln!(
            self.body,
            "  <Say voice=\"{}\" language=\"{}\">{}</Say>",
            escape_xml(&options.voice),
            escape_xml(&options.language),
            escape_xml(text)
        );
        self
    }

    pub fn gather(mut self, options: &GatherOptions) -> Self {
        let _ = writeln!(
            self.body,
            "  <Gather input=\"speech\" action=\"{}\" method=\"POST\" speechTimeout=\"{}\" timeout=\"{}\" language=\"{}\" />",
            escape_xml(&options.action),
            options.speech_timeout_secs,
            options.timeout_secs,
            escape_xml(&options.language)
        );
        self
    }

    /// Attach a bidirectional media stream with custom parameters.
    pub fn connect_stream(mut self, url: &str, parameters: &[(&str, &str)]) -> Self {
        let _ = writeln!(self.body, "  <Connect>");
        let _ = writeln!(self.body, "    <Stream url=\"{}\">", escape_xml(url));
        for (name, value) in parameters {
            let _ = writeln!(
                self.body,
                "      <Parameter name=\"{}\" value=\"{}\" />",
                escape_xml(name),
                escape_xml(value)
            );
        }
        let _ = writeln!(self.body, "    </Stream>");
        let _ = writeln!(self.body, "  </Connect>");
        self
    }

    pub fn hangup(mut self) -> Self {
        self.body.push_str("  <Hangup/>\n");
        self
    }

    pub fn build(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n{}</Response>",
            self.body
        )
    }

    /// Speak and end the call.
    pub fn say_and_hangup(text: &str, options: &SayOptions) -> String {
        Self::new().say(text, options).hangup().build()
    }

    /// Speak, listen for an answer, and hang up with `no_answer` if none comes.
    pub fn say_and_gather(
        text: &str,
        no_answer: &str,
        say: &SayOptions,
        gather: &GatherOptions,
    ) -> String {
        Self::new()
            .say(text, say)
            .gather(gather)
            .say(no_answer, say)
            .hangup()
            .build()
    }
}

/// Escape the five XML special characters.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gather() -> GatherOptions {
        GatherOptions {
            action: "https://gw.example.com/voice/turn?interviewId=a&b".to_string(),
            speech_timeout_secs: 3,
            timeout_secs: 5,
            language: "fi-FI".to_string(),
        }
    }

    #[test]
    fn test_say_and_hangup() {
        let xml = TwimlBuilder::say_and_hangup("Kiitos!", &SayOptions::default());
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n  <Say voice=\"alice\" language=\"fi-FI\">Kiitos!</Say>\n  <Hangup/>\n</Response>"
        );
    }

    #[test]
    fn test_gather_has_timeout_and_fallback() {
        let xml = TwimlBuilder::say_and_gather(
            "Mikä nimesi on?",
            "En kuullut vastausta. Lopetan puhelun.",
            &SayOptions::default(),
            &gather(),
        );

        let gather_at = xml.find("<Gather").unwrap();
        let fallback_at = xml.find("En kuullut vastausta").unwrap();
        let hangup_at = xml.find("<Hangup/>").unwrap();
        assert!(gather_at < fallback_at && fallback_at < hangup_at);
        assert!(xml.contains("timeout=\"5\""));
        assert!(xml.contains("speechTimeout=\"3\""));
        assert!(xml.contains("method=\"POST\""));
        assert!(xml.contains("action=\"https://gw.example.com/voice/turn?interviewId=a&amp;b\""));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = TwimlBuilder::new()
            .say("<b>Tom & \"Jerry\"</b>", &SayOptions::default())
            .build();
        assert!(xml.contains("&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"));
        assert!(!xml.contains("<b>"));
    }

    #[test]
    fn test_connect_stream_parameters() {
        let xml = TwimlBuilder::new()
            .connect_stream(
                "wss://gw.example.com/voice/stream",
                &[("interviewId", "int-1"), ("from", "+358 40 123")],
            )
            .build();
        assert!(xml.contains("<Connect>"));
        assert!(xml.contains("<Stream url=\"wss://gw.example.com/voice/stream\">"));
        assert!(xml.contains("<Parameter name=\"interviewId\" value=\"int-1\" />"));
        assert!(xml.contains("<Parameter name=\"from\" value=\"+358 40 123\" />"));
    }
}
