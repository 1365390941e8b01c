//! Symptom checker: a keyword-driven medicine suggester.
//!
//! [`respond`] is a pure lookup. [`SymptomChat`] wraps it in a transcript
//! with a short "thinking" delay and remembers which suggestions are already
//! in the cart.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use medico_core::{Price, ProductId};
use serde::Serialize;

use crate::cart::CartService;
use crate::catalog::Product;
use crate::error::Result;

/// First message of every chat.
pub const WELCOME: &str = "👋 Hello! I'm your health assistant. Tell me how you're feeling, and I'll suggest suitable medicines for you.";

/// A medicine the checker can suggest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Medicine {
    pub product: Product,
    pub description: String,
    pub dosage: Option<String>,
    pub form: String,
}

/// What the checker says back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymptomReply {
    pub reply: String,
    pub suggestions: Vec<Medicine>,
}

struct MedicineRow {
    id: i32,
    name: &'static str,
    rupees: i64,
    image: &'static str,
    description: &'static str,
    dosage: Option<&'static str>,
    form: &'static str,
}

impl MedicineRow {
    fn to_medicine(&self) -> Medicine {
        Medicine {
            product: Product {
                id: ProductId::new(self.id),
                name: self.name.to_string(),
                price: Price::from_paise(self.rupees * 100),
                image: self.image.to_string(),
            },
            description: self.description.to_string(),
            dosage: self.dosage.map(String::from),
            form: self.form.to_string(),
        }
    }
}

struct Group {
    keywords: &'static [&'static str],
    reply: &'static str,
    medicines: &'static [MedicineRow],
}

macro_rules! medicine {
    ($id:expr, $name:expr, $rupees:expr, $image:expr, $description:expr, $dosage:expr, $form:expr) => {
        MedicineRow {
            id: $id,
            name: $name,
            rupees: $rupees,
            image: $image,
            description: $description,
            dosage: $dosage,
            form: $form,
        }
    };
}

// Medicine IDs start at 101 so they never collide with catalog products.
static GROUPS: [Group; 4] = [
    Group {
        keywords: &["head"],
        reply: "I understand you have a headache. Here are some medicines that can help:",
        medicines: &[
            medicine!(101, "Aspirin 500mg", 45, "assets/images/aspirin.webp", "Effective pain relief and fever reducer", Some("500mg"), "Tablet"),
            medicine!(102, "Paracetamol (Crocin) 500mg", 55, "assets/images/paracetamol.webp", "Fast-acting pain and fever relief", Some("500mg"), "Tablet"),
            medicine!(103, "Ibuprofen 400mg", 65, "assets/images/ibuprofen.webp", "Anti-inflammatory pain reliever", Some("400mg"), "Tablet"),
        ],
    },
    Group {
        keywords: &["cold", "cough"],
        reply: "For cold and cough symptoms, I recommend these medicines:",
        medicines: &[
            medicine!(104, "Strepsils Lemon", 35, "assets/images/strepsils.webp", "Sore throat and cold relief", None, "Lozenge"),
            medicine!(105, "Cough Syrup (Benadryl)", 85, "assets/images/cough-syrup.webp", "Multi-symptom cold and cough relief", Some("100ml"), "Syrup"),
            medicine!(106, "Vitamin C 500mg", 95, "assets/images/vitamin-c.webp", "Immune system booster", Some("500mg"), "Tablet"),
        ],
    },
    Group {
        keywords: &["fever"],
        reply: "To help with your fever, here are my suggestions:",
        medicines: &[
            medicine!(107, "Thermocol Fever Strip", 25, "assets/images/fever-strip.webp", "Instant fever relief band", None, "Strip"),
            medicine!(108, "Paracetamol (Dolo) 650mg", 65, "assets/images/dolo.webp", "Fast-acting fever reducer", Some("650mg"), "Tablet"),
            medicine!(109, "Electrolyte Drink Mix", 75, "assets/images/electrolyte.webp", "Rehydration during fever", None, "Powder"),
        ],
    },
    Group {
        keywords: &["stomach", "gas", "acidity"],
        reply: "For stomach-related issues, these medicines should help:",
        medicines: &[
            medicine!(110, "Antacid Gel (Digene)", 55, "assets/images/digene.webp", "Relief from acidity and gas", None, "Gel"),
            medicine!(111, "Omeprazole 20mg", 95, "assets/images/omeprazole.webp", "Acid reflux and heartburn relief", Some("20mg"), "Tablet"),
            medicine!(112, "Probiotics (Align)", 250, "assets/images/probiotics.webp", "Digestive health support", None, "Capsule"),
        ],
    },
];

static FALLBACK: Group = Group {
    keywords: &[],
    reply: "Here are some general health supplements that might help:",
    medicines: &[
        medicine!(113, "Multivitamin Tablets", 180, "assets/images/multivitamin.webp", "Complete daily vitamin supplement", None, "Tablet"),
        medicine!(114, "Vitamin D3 1000IU", 120, "assets/images/vitamin-d.webp", "Bone and immunity support", Some("1000IU"), "Tablet"),
    ],
};

/// Suggest medicines for a free-text description of symptoms.
///
/// Groups are tried in order and the first one with a keyword contained in
/// the (lower-cased) text wins.
#[must_use]
pub fn respond(text: &str) -> SymptomReply {
    let text = text.to_lowercase();
    let group = GROUPS
        .iter()
        .find(|g| g.keywords.iter().any(|k| text.contains(k)))
        .unwrap_or(&FALLBACK);

    SymptomReply {
        reply: group.reply.to_string(),
        suggestions: group.medicines.iter().map(MedicineRow::to_medicine).collect(),
    }
}

/// Look up a suggestable medicine by product ID.
#[must_use]
pub fn find_medicine(id: ProductId) -> Option<Medicine> {
    GROUPS
        .iter()
        .chain(std::iter::once(&FALLBACK))
        .flat_map(|g| g.medicines.iter())
        .find(|m| m.id == id.as_i32())
        .map(MedicineRow::to_medicine)
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Bot,
}

/// A suggestion as shown in the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSuggestion {
    pub medicine: Medicine,
    /// Not yet in the cart when the chat was opened (or added since).
    pub addable: bool,
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub author: Author,
    pub text: String,
    pub suggestions: Vec<ChatSuggestion>,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    fn bot(text: impl Into<String>) -> Self {
        Self {
            author: Author::Bot,
            text: text.into(),
            suggestions: Vec::new(),
            at: Utc::now(),
        }
    }
}

/// A symptom-checker conversation.
pub struct SymptomChat {
    cart: CartService,
    delay: Duration,
    in_cart: HashSet<String>,
    messages: Vec<ChatMessage>,
}

impl SymptomChat {
    /// Start a chat, snapshotting the names currently in the cart.
    #[must_use]
    pub fn open(cart: CartService, delay: Duration) -> Self {
        let in_cart = cart.cart().names().map(String::from).collect();
        Self {
            cart,
            delay,
            in_cart,
            messages: vec![ChatMessage::bot(WELCOME)],
        }
    }

    /// The transcript, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Post a user message and wait for the reply.
    ///
    /// Blank input is ignored and returns `None`.
    pub async fn send(&mut self, text: &str) -> Option<&ChatMessage> {
        if text.trim().is_empty() {
            return None;
        }

        self.messages.push(ChatMessage {
            author: Author::User,
            text: text.to_string(),
            suggestions: Vec::new(),
            at: Utc::now(),
        });

        tokio::time::sleep(self.delay).await;

        let reply = respond(text);
        let suggestions = reply
            .suggestions
            .into_iter()
            .map(|medicine| ChatSuggestion {
                addable: !self.in_cart.contains(&medicine.product.name),
                medicine,
            })
            .collect();
        self.messages.push(ChatMessage {
            suggestions,
            ..ChatMessage::bot(reply.reply)
        });
        self.messages.last()
    }

    /// Whether `name` counts as already in the cart for this chat.
    #[must_use]
    pub fn is_in_cart(&self, name: &str) -> bool {
        self.in_cart.contains(name)
    }

    /// Put one unit of a suggested medicine in the cart.
    ///
    /// # Errors
    ///
    /// Returns the cart error; the suggestion stays addable in that case.
    pub async fn add_to_cart(&mut self, medicine: &Medicine) -> Result<()> {
        self.cart.add(&medicine.product, 1).await?;
        self.in_cart.insert(medicine.product.name.clone());
        for suggestion in self
            .messages
            .iter_mut()
            .flat_map(|m| m.suggestions.iter_mut())
            .filter(|s| s.medicine.product.name == medicine.product.name)
        {
            suggestion.addable = false;
        }
        Ok(())
    }

    /// Reset the transcript to the welcome message.
    pub fn clear(&mut self) {
        self.messages = vec![ChatMessage::bot(WELCOME)];
    }
}
