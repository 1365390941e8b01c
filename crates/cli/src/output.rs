//! Plain-text rendering for terminal output.
//!
//! Diagnostics go to stderr through `tracing`; everything here is the
//! command's actual result and goes to stdout.

#![allow(clippy::print_stdout)]

use std::io::Write;

use medico_client::catalog::Product;
use medico_client::guard::Navigation;
use medico_client::notify::{ConfirmDialog, ToastKind, Toasts};
use medico_client::symptom::ChatMessage;
use medico_client::{Cart, Session};

pub fn line(text: impl std::fmt::Display) {
    println!("{text}");
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }
    for product in products {
        println!("{:>4}  {:<32} {:>10}", product.id, product.name, product.price_label());
    }
}

pub fn cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for line in cart.lines() {
        println!(
            "{:>4}  {:<32} {:>10} x {:<3} {:>10}",
            line.product_id,
            line.name,
            line.price_label,
            line.quantity,
            line.subtotal()
        );
    }
    println!("{} item(s), total {}", cart.count(), cart.total());
}

pub fn session(session: Option<&Session>) {
    match session {
        Some(session) if session.authenticated => {
            let roles: Vec<&str> = session.roles.iter().map(|r| r.as_str()).collect();
            println!(
                "Signed in as user {} ({}), session {}",
                session.user_id,
                roles.join(", "),
                session.session_id
            );
        }
        _ => println!("Not signed in."),
    }
}

pub fn reply(message: &ChatMessage) {
    println!("{}", message.text);
    for suggestion in &message.suggestions {
        let medicine = &suggestion.medicine;
        let marker = if suggestion.addable { " " } else { "✓" };
        println!(
            "{marker} {:>4}  {:<28} {:>10}  {} ({})",
            medicine.product.id,
            medicine.product.name,
            medicine.product.price_label(),
            medicine.description,
            medicine.form
        );
        if let Some(dosage) = &medicine.dosage {
            println!("        {dosage}");
        }
    }
}

pub fn navigation(nav: &Navigation) {
    for hop in &nav.redirects {
        println!("-> {hop}");
    }
    println!("{} ({:?})", nav.path, nav.page);
}

pub fn dialog(dialog: &ConfirmDialog) {
    let request = &dialog.request;
    println!("{}", request.title);
    println!("{}", request.message);
    print!("[{} = y / {} = N] ", request.confirm_text, request.cancel_text);
    std::io::stdout().flush().ok();
}

pub fn ask(label: &str) {
    print!("{label}: ");
    std::io::stdout().flush().ok();
}

/// Print and clear pending notifications.
pub fn toasts(toasts: &Toasts) {
    for toast in toasts.drain() {
        let prefix = match toast.kind {
            ToastKind::Info => "i",
            ToastKind::Success => "+",
            ToastKind::Error => "!",
        };
        println!("[{prefix}] {}", toast.message);
    }
}
