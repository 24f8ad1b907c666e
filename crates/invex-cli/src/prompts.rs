//! Prompt text sent to the extraction model.

/// System prompt: output schema and extraction rules.
pub const SYSTEM_PROMPT: &str = r#"You extract structured data from supplier invoices (PDF text or image). Return valid JSON only: no prose, no explanations, no markdown.

Use exactly this schema:
{
  "supplier_name": string or null,
  "supplier_address": string or null,
  "supplier_vat_id": string or null,
  "invoice_number": string or null,
  "invoice_date": "YYYY-MM-DD" or null,
  "due_date": "YYYY-MM-DD" or null,
  "items": [
    {
      "description": string,
      "quantity": number,
      "unit_price": number,
      "unit": string or null,
      "net_amount": number,
      "tax_rate": number or null,
      "tax_amount": number or null,
      "currency": "EUR",
      "category": string
    }
  ],
  "net_total": number or null,
  "tax_total": number or null,
  "gross_total": number or null,
  "currency": "EUR",
  "payment_method": string or null,
  "iban": string or null,
  "notes": string or null
}

Rules:
- Numbers use a decimal point (12.50), never a comma.
- Missing, unreadable or ambiguous values are null. Never invent content.
- The supplier is the company issuing the invoice, never the recipient.
- supplier_vat_id only when a VAT ID is printed (German: "DE" followed by 9 digits). A tax number is not a VAT ID.
- iban only when printed completely; spaces may be removed, nothing else may change.
- due_date: copy a printed due date exactly. If only a term is given ("payable within 8 days"), add the days to invoice_date. If terms conflict, prefer the one next to the totals, then "without deduction", then the shorter term. Otherwise null.
- Every line with a description is an item. Description, quantity, unit, price and net amount come from the document.
- tax_rate only when printed (7 % = 7.0, 19 % = 19.0).
- tax_amount = net_amount * tax_rate / 100 rounded to 2 decimals, unless the exact amount is printed.
- Deposits (crates, bottles, kegs) listed with a price are items with category "Packaging", including negative returns. A deposit total outside the item list is not an item.
- category is required for every item, one of: Seafood, Meat, Produce, Dairy, Beverages, Service, Cleaning Supplies, Packaging, Other.
- notes only with original text such as retention of title or direct debit notices. Do not repeat the IBAN and do not combine conflicting payment terms.
- No additional fields."#;

/// User instruction accompanying an image.
pub const IMAGE_INSTRUCTION: &str = "Extract the JSON from this invoice:";

/// User message for text extracted from a PDF.
pub fn text_instruction(document_text: &str) -> String {
    format!("Extract the JSON from this invoice text:\n\n{}", document_text)
}
