//! Curated hints for well-known domains

use crate::types::label::{
    COMMUNICATION, CONTENT, INFORMATIONAL, NAVIGATIONAL, SEARCH, TRANSACTIONAL,
};
use std::collections::HashMap;
use std::sync::OnceLock;

/// What a domain usually is, expressed in classifier labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainHint {
    pub category: &'static str,
    pub content_type: &'static str,
    pub common_intent: &'static str,
}

const fn hint(category: &'static str, content_type: &'static str, common_intent: &'static str) -> DomainHint {
    DomainHint {
        category,
        content_type,
        common_intent,
    }
}

const EMAIL: DomainHint = hint("email", COMMUNICATION, TRANSACTIONAL);
const CHAT: DomainHint = hint("chat", COMMUNICATION, TRANSACTIONAL);
const SOCIAL: DomainHint = hint("social", COMMUNICATION, NAVIGATIONAL);
const SEARCH_ENGINE: DomainHint = hint("search", SEARCH, INFORMATIONAL);
const NEWS: DomainHint = hint("news", CONTENT, INFORMATIONAL);
const VIDEO: DomainHint = hint("video", CONTENT, INFORMATIONAL);
const MUSIC: DomainHint = hint("music", CONTENT, NAVIGATIONAL);
const REFERENCE: DomainHint = hint("reference", CONTENT, INFORMATIONAL);
const DOCS: DomainHint = hint("documentation", CONTENT, INFORMATIONAL);
const DEV: DomainHint = hint("development", CONTENT, NAVIGATIONAL);
const FORUM: DomainHint = hint("forum", COMMUNICATION, INFORMATIONAL);
const SHOPPING: DomainHint = hint("shopping", CONTENT, TRANSACTIONAL);
const FINANCE: DomainHint = hint("finance", CONTENT, TRANSACTIONAL);
const TRAVEL: DomainHint = hint("travel", CONTENT, TRANSACTIONAL);
const PRODUCTIVITY: DomainHint = hint("productivity", CONTENT, TRANSACTIONAL);
const LEARNING: DomainHint = hint("learning", CONTENT, INFORMATIONAL);
const MAPS: DomainHint = hint("maps", SEARCH, NAVIGATIONAL);
const BLOG: DomainHint = hint("blog", CONTENT, INFORMATIONAL);

static KNOWN_DOMAINS: &[(&str, DomainHint)] = &[
    // Email
    ("mail.google.com", EMAIL),
    ("gmail.com", EMAIL),
    ("outlook.live.com", EMAIL),
    ("outlook.office.com", EMAIL),
    ("outlook.office365.com", EMAIL),
    ("mail.yahoo.com", EMAIL),
    ("mail.proton.me", EMAIL),
    ("protonmail.com", EMAIL),
    ("fastmail.com", EMAIL),
    ("icloud.com", EMAIL),
    ("mail.aol.com", EMAIL),
    ("hey.com", EMAIL),
    ("tutanota.com", EMAIL),
    ("zoho.com", EMAIL),
    // Chat and meetings
    ("slack.com", CHAT),
    ("app.slack.com", CHAT),
    ("discord.com", CHAT),
    ("teams.microsoft.com", CHAT),
    ("web.whatsapp.com", CHAT),
    ("web.telegram.org", CHAT),
    ("messenger.com", CHAT),
    ("messages.google.com", CHAT),
    ("chat.google.com", CHAT),
    ("meet.google.com", CHAT),
    ("zoom.us", CHAT),
    ("app.element.io", CHAT),
    ("signal.org", CHAT),
    ("mattermost.com", CHAT),
    ("chat.openai.com", CHAT),
    ("chatgpt.com", CHAT),
    ("claude.ai", CHAT),
    ("gemini.google.com", CHAT),
    // Social
    ("twitter.com", SOCIAL),
    ("x.com", SOCIAL),
    ("facebook.com", SOCIAL),
    ("instagram.com", SOCIAL),
    ("linkedin.com", SOCIAL),
    ("mastodon.social", SOCIAL),
    ("bsky.app", SOCIAL),
    ("threads.net", SOCIAL),
    ("tiktok.com", SOCIAL),
    ("pinterest.com", SOCIAL),
    ("tumblr.com", SOCIAL),
    ("snapchat.com", SOCIAL),
    // Forums and Q&A
    ("reddit.com", FORUM),
    ("old.reddit.com", FORUM),
    ("news.ycombinator.com", FORUM),
    ("stackoverflow.com", FORUM),
    ("stackexchange.com", FORUM),
    ("superuser.com", FORUM),
    ("serverfault.com", FORUM),
    ("askubuntu.com", FORUM),
    ("quora.com", FORUM),
    ("lobste.rs", FORUM),
    ("users.rust-lang.org", FORUM),
    ("discourse.org", FORUM),
    // Search engines
    ("google.com", SEARCH_ENGINE),
    ("www.google.com", SEARCH_ENGINE),
    ("bing.com", SEARCH_ENGINE),
    ("duckduckgo.com", SEARCH_ENGINE),
    ("search.yahoo.com", SEARCH_ENGINE),
    ("yandex.com", SEARCH_ENGINE),
    ("baidu.com", SEARCH_ENGINE),
    ("ecosia.org", SEARCH_ENGINE),
    ("search.brave.com", SEARCH_ENGINE),
    ("startpage.com", SEARCH_ENGINE),
    ("kagi.com", SEARCH_ENGINE),
    ("perplexity.ai", SEARCH_ENGINE),
    ("scholar.google.com", SEARCH_ENGINE),
    // Maps
    ("maps.google.com", MAPS),
    ("maps.apple.com", MAPS),
    ("openstreetmap.org", MAPS),
    ("waze.com", MAPS),
    // News
    ("nytimes.com", NEWS),
    ("washingtonpost.com", NEWS),
    ("theguardian.com", NEWS),
    ("bbc.com", NEWS),
    ("bbc.co.uk", NEWS),
    ("cnn.com", NEWS),
    ("reuters.com", NEWS),
    ("apnews.com", NEWS),
    ("bloomberg.com", NEWS),
    ("wsj.com", NEWS),
    ("ft.com", NEWS),
    ("economist.com", NEWS),
    ("npr.org", NEWS),
    ("aljazeera.com", NEWS),
    ("theverge.com", NEWS),
    ("arstechnica.com", NEWS),
    ("wired.com", NEWS),
    ("techcrunch.com", NEWS),
    ("engadget.com", NEWS),
    ("theatlantic.com", NEWS),
    ("newyorker.com", NEWS),
    ("politico.com", NEWS),
    ("axios.com", NEWS),
    ("vox.com", NEWS),
    ("lwn.net", NEWS),
    ("news.google.com", NEWS),
    // Blogs and publishing
    ("medium.com", BLOG),
    ("substack.com", BLOG),
    ("dev.to", BLOG),
    ("hashnode.com", BLOG),
    ("wordpress.com", BLOG),
    ("blogspot.com", BLOG),
    ("ghost.io", BLOG),
    // Video
    ("youtube.com", VIDEO),
    ("youtu.be", VIDEO),
    ("vimeo.com", VIDEO),
    ("twitch.tv", VIDEO),
    ("netflix.com", VIDEO),
    ("hulu.com", VIDEO),
    ("disneyplus.com", VIDEO),
    ("primevideo.com", VIDEO),
    ("dailymotion.com", VIDEO),
    ("ted.com", VIDEO),
    // Music and audio
    ("open.spotify.com", MUSIC),
    ("spotify.com", MUSIC),
    ("music.apple.com", MUSIC),
    ("music.youtube.com", MUSIC),
    ("soundcloud.com", MUSIC),
    ("bandcamp.com", MUSIC),
    ("pandora.com", MUSIC),
    ("podcasts.apple.com", MUSIC),
    // Reference
    ("wikipedia.org", REFERENCE),
    ("en.wikipedia.org", REFERENCE),
    ("wiktionary.org", REFERENCE),
    ("britannica.com", REFERENCE),
    ("merriam-webster.com", REFERENCE),
    ("dictionary.com", REFERENCE),
    ("imdb.com", REFERENCE),
    ("goodreads.com", REFERENCE),
    ("archive.org", REFERENCE),
    ("arxiv.org", REFERENCE),
    ("scholar.archive.org", REFERENCE),
    ("pubmed.ncbi.nlm.nih.gov", REFERENCE),
    ("researchgate.net", REFERENCE),
    ("wolframalpha.com", REFERENCE),
    // Documentation
    ("docs.rs", DOCS),
    ("doc.rust-lang.org", DOCS),
    ("docs.python.org", DOCS),
    ("developer.mozilla.org", DOCS),
    ("docs.github.com", DOCS),
    ("docs.microsoft.com", DOCS),
    ("learn.microsoft.com", DOCS),
    ("developer.apple.com", DOCS),
    ("developer.android.com", DOCS),
    ("cloud.google.com", DOCS),
    ("docs.aws.amazon.com", DOCS),
    ("kubernetes.io", DOCS),
    ("docs.docker.com", DOCS),
    ("readthedocs.io", DOCS),
    ("readthedocs.org", DOCS),
    ("devdocs.io", DOCS),
    ("pkg.go.dev", DOCS),
    ("nodejs.org", DOCS),
    ("react.dev", DOCS),
    ("tokio.rs", DOCS),
    // Development
    ("github.com", DEV),
    ("gist.github.com", DEV),
    ("gitlab.com", DEV),
    ("bitbucket.org", DEV),
    ("codeberg.org", DEV),
    ("crates.io", DEV),
    ("npmjs.com", DEV),
    ("pypi.org", DEV),
    ("hub.docker.com", DEV),
    ("codepen.io", DEV),
    ("codesandbox.io", DEV),
    ("replit.com", DEV),
    ("vercel.com", DEV),
    ("netlify.com", DEV),
    ("console.aws.amazon.com", DEV),
    ("portal.azure.com", DEV),
    ("console.cloud.google.com", DEV),
    ("huggingface.co", DEV),
    ("kaggle.com", DEV),
    // Shopping
    ("amazon.com", SHOPPING),
    ("amazon.co.uk", SHOPPING),
    ("amazon.de", SHOPPING),
    ("ebay.com", SHOPPING),
    ("etsy.com", SHOPPING),
    ("walmart.com", SHOPPING),
    ("target.com", SHOPPING),
    ("bestbuy.com", SHOPPING),
    ("aliexpress.com", SHOPPING),
    ("ikea.com", SHOPPING),
    ("costco.com", SHOPPING),
    ("newegg.com", SHOPPING),
    ("shopify.com", SHOPPING),
    ("wayfair.com", SHOPPING),
    // Finance
    ("paypal.com", FINANCE),
    ("chase.com", FINANCE),
    ("bankofamerica.com", FINANCE),
    ("wellsfargo.com", FINANCE),
    ("americanexpress.com", FINANCE),
    ("schwab.com", FINANCE),
    ("fidelity.com", FINANCE),
    ("vanguard.com", FINANCE),
    ("robinhood.com", FINANCE),
    ("coinbase.com", FINANCE),
    ("stripe.com", FINANCE),
    ("venmo.com", FINANCE),
    ("wise.com", FINANCE),
    ("mint.intuit.com", FINANCE),
    // Travel
    ("booking.com", TRAVEL),
    ("airbnb.com", TRAVEL),
    ("expedia.com", TRAVEL),
    ("kayak.com", TRAVEL),
    ("tripadvisor.com", TRAVEL),
    ("skyscanner.net", TRAVEL),
    ("hotels.com", TRAVEL),
    ("united.com", TRAVEL),
    ("delta.com", TRAVEL),
    ("uber.com", TRAVEL),
    // Productivity
    ("docs.google.com", PRODUCTIVITY),
    ("drive.google.com", PRODUCTIVITY),
    ("sheets.google.com", PRODUCTIVITY),
    ("calendar.google.com", PRODUCTIVITY),
    ("notion.so", PRODUCTIVITY),
    ("trello.com", PRODUCTIVITY),
    ("asana.com", PRODUCTIVITY),
    ("airtable.com", PRODUCTIVITY),
    ("figma.com", PRODUCTIVITY),
    ("miro.com", PRODUCTIVITY),
    ("dropbox.com", PRODUCTIVITY),
    ("onedrive.live.com", PRODUCTIVITY),
    ("atlassian.net", PRODUCTIVITY),
    ("linear.app", PRODUCTIVITY),
    ("monday.com", PRODUCTIVITY),
    ("todoist.com", PRODUCTIVITY),
    ("evernote.com", PRODUCTIVITY),
    ("canva.com", PRODUCTIVITY),
    ("office.com", PRODUCTIVITY),
    // Learning
    ("coursera.org", LEARNING),
    ("edx.org", LEARNING),
    ("udemy.com", LEARNING),
    ("khanacademy.org", LEARNING),
    ("duolingo.com", LEARNING),
    ("leetcode.com", LEARNING),
    ("freecodecamp.org", LEARNING),
    ("brilliant.org", LEARNING),
    ("exercism.org", LEARNING),
    ("w3schools.com", LEARNING),
];

/// Webmail and chat hosts not covered by the table, matched as suffixes
const COMMUNICATION_DOMAINS: &[&str] = &[
    "mail.com",
    "gmx.com",
    "gmx.net",
    "yandex.ru",
    "mail.ru",
    "roundcube.net",
    "rocket.chat",
    "zulipchat.com",
    "gitter.im",
    "whereby.com",
    "webex.com",
    "skype.com",
    "line.me",
    "wechat.com",
    "kakao.com",
];

const COMMUNICATION_PREFIXES: &[&str] = &["mail.", "webmail.", "chat.", "messages.", "inbox."];

/// Search hosts not covered by the table, matched as suffixes
const SEARCH_DOMAINS: &[&str] = &[
    "search.aol.com",
    "ask.com",
    "qwant.com",
    "mojeek.com",
    "searx.be",
    "you.com",
    "naver.com",
    "seznam.cz",
    "yep.com",
    "swisscows.com",
];

const SEARCH_PREFIXES: &[&str] = &["search."];

/// Second-level labels that sit under a country code (`co.uk`, `com.au`)
const COUNTRY_SECOND_LEVEL: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu", "ne", "or"];

const MOBILE_PREFIXES: &[&str] = &["www.", "m.", "mobile."];

fn table() -> &'static HashMap<&'static str, DomainHint> {
    static TABLE: OnceLock<HashMap<&'static str, DomainHint>> = OnceLock::new();
    TABLE.get_or_init(|| KNOWN_DOMAINS.iter().copied().collect())
}

/// Number of curated entries
pub fn known_domain_count() -> usize {
    table().len()
}

/// Hint for `domain`: exact match, then without a `www.`/`m.`/`mobile.`
/// prefix, then the registrable parent domain.
pub fn lookup(domain: &str) -> Option<DomainHint> {
    let domain = normalize(domain);
    if domain.is_empty() {
        return None;
    }
    let table = table();

    if let Some(hint) = table.get(domain.as_str()) {
        return Some(*hint);
    }

    let stripped = strip_mobile_prefix(&domain);
    if stripped != domain {
        if let Some(hint) = table.get(stripped) {
            return Some(*hint);
        }
    }

    let parent = registrable_domain(stripped);
    if parent != stripped {
        if let Some(hint) = table.get(parent) {
            return Some(*hint);
        }
    }

    None
}

/// Known webmail or chat host
pub fn is_communication_domain(domain: &str) -> bool {
    let domain = normalize(domain);
    let host = strip_mobile_prefix(&domain);
    COMMUNICATION_PREFIXES.iter().any(|p| host.starts_with(p))
        || COMMUNICATION_DOMAINS.iter().any(|d| matches_suffix(host, d))
}

/// Known search-engine host
pub fn is_search_domain(domain: &str) -> bool {
    let domain = normalize(domain);
    let host = strip_mobile_prefix(&domain);
    SEARCH_PREFIXES.iter().any(|p| host.starts_with(p))
        || SEARCH_DOMAINS.iter().any(|d| matches_suffix(host, d))
}

fn normalize(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn strip_mobile_prefix(domain: &str) -> &str {
    MOBILE_PREFIXES
        .iter()
        .find_map(|p| domain.strip_prefix(p))
        .filter(|rest| rest.contains('.'))
        .unwrap_or(domain)
}

fn matches_suffix(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .map_or(false, |head| head.ends_with('.'))
}

/// Last two labels, or last three under a country second-level domain
fn registrable_domain(domain: &str) -> &str {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() <= 2 {
        return domain;
    }
    let n = labels.len();
    let keep = if labels[n - 1].len() == 2 && COUNTRY_SECOND_LEVEL.contains(&labels[n - 2]) {
        3
    } else {
        2
    };
    if n <= keep {
        return domain;
    }
    let skip: usize = labels[..n - keep].iter().map(|l| l.len() + 1).sum();
    &domain[skip..]
}
